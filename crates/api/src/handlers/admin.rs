use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::error::AppResult;
use crate::state::AppState;

/// DELETE /api/v1/admin/bids
///
/// Irrecoverably delete every bid. Only mounted when
/// `ENABLE_ADMIN_RESET` is set.
pub async fn reset_bids(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    state.ledger.reset_all(state.ledger.deadline()).await?;
    Ok(StatusCode::NO_CONTENT)
}
