//! Bid input validation.
//!
//! Runs before any storage call so bad input never reaches the ledger
//! transaction. Song ids are opaque: they are checked for presence and
//! length only, never normalised.

use crate::error::CoreError;

/// Maximum length (bytes) of a song identifier.
pub const MAX_SONG_ID_LEN: usize = 512;

/// Validate that a bid amount is strictly positive.
pub fn validate_bid_amount(amount: i64) -> Result<(), CoreError> {
    if amount <= 0 {
        return Err(CoreError::Validation(format!(
            "Bid amount must be positive, got {amount}"
        )));
    }
    Ok(())
}

/// Validate a song identifier: non-blank and within length limit.
pub fn validate_song_id(song_id: &str) -> Result<(), CoreError> {
    if song_id.trim().is_empty() {
        return Err(CoreError::Validation(
            "Song id must not be empty".to_string(),
        ));
    }
    if song_id.len() > MAX_SONG_ID_LEN {
        return Err(CoreError::Validation(format!(
            "Song id too long: {} bytes (max {MAX_SONG_ID_LEN})",
            song_id.len()
        )));
    }
    Ok(())
}

/// Validate all fields of a new bid.
pub fn validate_new_bid(amount: i64, song_id: &str) -> Result<(), CoreError> {
    validate_bid_amount(amount)?;
    validate_song_id(song_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_amount_is_accepted() {
        assert!(validate_bid_amount(1).is_ok());
        assert!(validate_bid_amount(i64::MAX).is_ok());
    }

    #[test]
    fn zero_and_negative_amounts_are_rejected() {
        let err = validate_bid_amount(0).unwrap_err();
        assert!(err.to_string().contains("must be positive"));
        assert!(validate_bid_amount(-5).is_err());
    }

    #[test]
    fn blank_song_id_is_rejected() {
        assert!(validate_song_id("").is_err());
        let err = validate_song_id("   ").unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn over_long_song_id_is_rejected() {
        let id = "x".repeat(MAX_SONG_ID_LEN + 1);
        let err = validate_song_id(&id).unwrap_err();
        assert!(err.to_string().contains("too long"));
        assert!(validate_song_id(&"x".repeat(MAX_SONG_ID_LEN)).is_ok());
    }

    #[test]
    fn new_bid_checks_amount_before_song() {
        let err = validate_new_bid(0, "").unwrap_err();
        assert!(err.to_string().contains("Bid amount"));
        assert!(validate_new_bid(3, "spotify:track:6ADzlFXHPk846zUCEOM2C1").is_ok());
    }
}
