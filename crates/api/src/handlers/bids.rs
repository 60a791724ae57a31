//! Handlers for bid submission, listing and ranking.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use songbid_db::models::bid::{BidCreated, BidListParams, CreateBid};
use songbid_db::models::status::SongStatus;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/bids
///
/// List every bid in insertion order. `?status=N` restricts the list to
/// one `song_status` value (0 queued, 1 playing, 2 finalized).
pub async fn list_bids(
    State(state): State<AppState>,
    Query(params): Query<BidListParams>,
) -> AppResult<impl IntoResponse> {
    let status = params
        .status
        .map(|id| {
            SongStatus::from_id(id)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown song_status {id}")))
        })
        .transpose()?;

    let bids = state
        .ledger
        .list_bids(status, state.ledger.deadline())
        .await?;

    tracing::debug!(count = bids.len(), ?status, "Listed bids");

    Ok(Json(DataResponse { data: bids }))
}

/// POST /api/v1/bids
///
/// Record a new queued bid. Returns 201 with the generated `bid_id`.
pub async fn create_bid(
    State(state): State<AppState>,
    Json(input): Json<CreateBid>,
) -> AppResult<impl IntoResponse> {
    let bid_id = state
        .ledger
        .record_bid(&input, state.ledger.deadline())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: BidCreated { bid_id },
        }),
    ))
}

/// GET /api/v1/bids/ranking
///
/// Total queued bid amount per song, highest first. Order among songs
/// with equal totals is not defined.
pub async fn rank_songs(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let ranking = state
        .ledger
        .rank_queued_songs(state.ledger.deadline())
        .await?;

    Ok(Json(DataResponse { data: ranking }))
}
