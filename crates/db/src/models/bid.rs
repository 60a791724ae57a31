//! Bid ledger models and DTOs.
//!
//! Maps to the `bids` table introduced in migration 20260101000001.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use songbid_core::types::{BidId, Timestamp};

use super::status::{SongStatus, StatusId};

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `bids` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct BidRecord {
    pub bid_id: BidId,
    pub song_id: String,
    pub bid_amount: i64,
    pub song_status: StatusId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl BidRecord {
    /// Decoded [`SongStatus`]. `None` only if the column holds a value the
    /// check constraint should have rejected.
    pub fn status(&self) -> Option<SongStatus> {
        SongStatus::from_id(self.song_status)
    }
}

// ---------------------------------------------------------------------------
// Derived
// ---------------------------------------------------------------------------

/// Total queued bid amount for one song. Computed per query, never stored.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct AggregateRanking {
    pub song_id: String,
    pub total_bid_amount: i64,
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// DTO for recording a new bid.
///
/// The `BidAmount` / `SongId` aliases keep older clients working.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBid {
    #[serde(alias = "BidAmount")]
    pub bid_amount: i64,
    #[serde(alias = "SongId")]
    pub song_id: String,
}

/// Response body for a recorded bid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidCreated {
    pub bid_id: BidId,
}

/// Query parameters for listing bids.
#[derive(Debug, Default, Deserialize)]
pub struct BidListParams {
    /// Restrict to a single `song_status` value.
    pub status: Option<StatusId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_bid_accepts_snake_case_and_legacy_names() {
        let a: CreateBid =
            serde_json::from_str(r#"{"bid_amount": 3, "song_id": "song-a"}"#).unwrap();
        assert_eq!(a.bid_amount, 3);
        assert_eq!(a.song_id, "song-a");

        let b: CreateBid = serde_json::from_str(r#"{"BidAmount": 1, "SongId": "some-id"}"#).unwrap();
        assert_eq!(b.bid_amount, 1);
        assert_eq!(b.song_id, "some-id");
    }

    #[test]
    fn create_bid_rejects_truncated_json() {
        let result = serde_json::from_str::<CreateBid>(r#"{"BidAmount": 1, "SongId": "some-id""#);
        assert!(result.is_err());
    }

    #[test]
    fn bid_record_serializes_status_as_integer() {
        let now = chrono::Utc::now();
        let record = BidRecord {
            bid_id: uuid::Uuid::new_v4(),
            song_id: "song-b".into(),
            bid_amount: 5,
            song_status: SongStatus::Playing.id(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["song_status"], 1);
        assert_eq!(json["bid_amount"], 5);
        assert!(json["created_at"].is_string());
        assert_eq!(record.status(), Some(SongStatus::Playing));
    }
}
