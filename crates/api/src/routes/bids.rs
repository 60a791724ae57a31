use axum::routing::get;
use axum::Router;

use crate::handlers::bids;
use crate::state::AppState;

/// Bid routes mounted at `/bids`.
///
/// ```text
/// GET    /          -> list_bids
/// POST   /          -> create_bid
/// GET    /ranking   -> rank_songs
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(bids::list_bids).post(bids::create_bid))
        .route("/ranking", get(bids::rank_songs))
}
