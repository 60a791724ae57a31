//! Handlers driving the playback state machine.
//!
//! Called by the playback collaborator, never by bidders. Both endpoints
//! answer 200 with an empty `data` array when there is nothing to do.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// PUT /api/v1/player/play
///
/// Mark the top-ranked queued song as playing and return all of its bids.
/// Responds 409 while a previous song has not been finalized.
pub async fn play_next(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let bids = state
        .ledger
        .select_and_play_next_song(state.ledger.deadline())
        .await?;

    match bids.first() {
        Some(first) => tracing::info!(
            song_id = %first.song_id,
            bid_count = bids.len(),
            "Returning bids for next song",
        ),
        None => tracing::info!("There are no songs to play"),
    }

    Ok(Json(DataResponse { data: bids }))
}

/// PUT /api/v1/player/finalize
///
/// Mark the playing song as played and return its bids.
pub async fn finalize(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let bids = state
        .ledger
        .finalize_current_song(state.ledger.deadline())
        .await?;

    if bids.is_empty() {
        tracing::info!("No songs currently playing");
    }

    Ok(Json(DataResponse { data: bids }))
}
