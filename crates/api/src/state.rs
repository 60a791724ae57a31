use std::sync::Arc;

use songbid_db::BidLedger;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: songbid_db::DbPool,
    /// The bid ledger; every bid read and status transition goes through it.
    pub ledger: BidLedger,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Build state from a pool and configuration.
    pub fn new(pool: songbid_db::DbPool, config: ServerConfig) -> Self {
        let ledger = BidLedger::new(
            pool.clone(),
            std::time::Duration::from_millis(config.ledger_timeout_ms),
        );
        Self {
            pool,
            ledger,
            config: Arc::new(config),
        }
    }
}
