//! HTTP client for the bid server's player endpoints.

use async_trait::async_trait;
use serde::Deserialize;
use songbid_core::types::BidId;

/// One bid row as returned by the player endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueuedBid {
    pub bid_id: BidId,
    pub song_id: String,
    pub bid_amount: i64,
    pub song_status: i16,
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerClientError {
    #[error("Bid server request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Bid server returned {status}: {body}")]
    Api { status: u16, body: String },
}

/// The two ledger transitions the playback loop drives.
#[async_trait]
pub trait BidQueue: Send + Sync {
    /// Promote the top-ranked queued song to playing. Returns its bids,
    /// empty when nothing is queued.
    async fn play_next(&self) -> Result<Vec<QueuedBid>, LedgerClientError>;

    /// Mark the playing song as finalized. Returns the finalized bids,
    /// empty when nothing was playing.
    async fn finalize(&self) -> Result<Vec<QueuedBid>, LedgerClientError>;
}

/// [`BidQueue`] backed by the bid server's REST API.
#[derive(Debug, Clone)]
pub struct LedgerClient {
    http: reqwest::Client,
    base_url: String,
}

impl LedgerClient {
    /// * `base_url` - API root including the version prefix, e.g.
    ///   `http://localhost:5050/api/v1`.
    pub fn new(http: reqwest::Client, base_url: String) -> Self {
        Self { http, base_url }
    }

    async fn put(&self, path: &str) -> Result<Vec<QueuedBid>, LedgerClientError> {
        let url = format!("{}{path}", self.base_url);
        let response = self.http.put(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerClientError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: DataEnvelope<Vec<QueuedBid>> = response.json().await?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl BidQueue for LedgerClient {
    async fn play_next(&self) -> Result<Vec<QueuedBid>, LedgerClientError> {
        self.put("/player/play").await
    }

    async fn finalize(&self) -> Result<Vec<QueuedBid>, LedgerClientError> {
        self.put("/player/finalize").await
    }
}
