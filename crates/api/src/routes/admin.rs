use axum::routing::delete;
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Administrative routes mounted at `/admin`.
///
/// ```text
/// DELETE /bids      -> reset_bids
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/bids", delete(admin::reset_bids))
}
