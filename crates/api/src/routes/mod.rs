pub mod admin;
pub mod bids;
pub mod health;
pub mod player;

use axum::Router;

use crate::config::ServerConfig;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /bids                  list (GET), record bid (POST)
/// /bids/ranking          queued totals per song (GET)
///
/// /player/play           select next song (PUT)
/// /player/finalize       finalize playing song (PUT)
///
/// /admin/bids            reset ledger (DELETE, only with ENABLE_ADMIN_RESET)
/// ```
pub fn api_routes(config: &ServerConfig) -> Router<AppState> {
    let router = Router::new()
        .nest("/bids", bids::router())
        .nest("/player", player::router());

    if config.enable_admin_reset {
        tracing::warn!("Admin reset endpoint enabled");
        router.nest("/admin", admin::router())
    } else {
        router
    }
}
