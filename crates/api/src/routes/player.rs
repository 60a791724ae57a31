use axum::routing::put;
use axum::Router;

use crate::handlers::player;
use crate::state::AppState;

/// Playback routes mounted at `/player`.
///
/// ```text
/// PUT    /play      -> play_next
/// PUT    /finalize  -> finalize
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/play", put(player::play_next))
        .route("/finalize", put(player::finalize))
}
