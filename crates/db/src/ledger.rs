//! The bid ledger: the only writer of `bids.song_status`.
//!
//! Each operation runs in its own transaction on a connection taken from the
//! pool and released before returning. Nothing is shared in memory between
//! calls; cross-call consistency comes from the database transaction.
//!
//! Every operation takes a [`Deadline`]. Connection acquisition, every
//! statement and the final `COMMIT` or `ROLLBACK` all run under it, and the
//! server is given matching `statement_timeout` / `lock_timeout` values so it
//! aborts the work on its side too. When the deadline passes the connection is
//! detached from the pool and closed, which aborts the open transaction, and
//! [`LedgerError::Timeout`] is returned. Nothing is retried here: `record_bid`
//! is not idempotent, and the caller knows which of its calls are safe to
//! repeat.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use futures::future::BoxFuture;
use sqlx::pool::PoolConnection;
use sqlx::postgres::Postgres;
use sqlx::{Connection, PgConnection, PgPool};
use songbid_core::bid::validate_new_bid;
use songbid_core::error::CoreError;
use songbid_core::types::{BidId, Timestamp};

use crate::models::bid::{AggregateRanking, BidRecord, CreateBid};
use crate::models::status::{SongStatus, StatusId};
use crate::repositories::BidRepo;

/// Absolute point in time after which an operation is abandoned.
pub type Deadline = tokio::time::Instant;

/// SQLSTATE for a serialization failure.
const SQLSTATE_SERIALIZATION_FAILURE: &str = "40001";
/// SQLSTATE raised when `statement_timeout` cancels a query.
const SQLSTATE_QUERY_CANCELED: &str = "57014";
/// SQLSTATE raised when `lock_timeout` expires.
const SQLSTATE_LOCK_NOT_AVAILABLE: &str = "55P03";

/// Errors returned by [`BidLedger`] operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Caller input was rejected, or the call conflicts with ledger state.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The deadline passed before the operation finished. Nothing was applied.
    #[error("Ledger operation '{operation}' exceeded its deadline")]
    Timeout { operation: &'static str },

    /// Connection, query, or constraint failure.
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl LedgerError {
    /// True when the database aborted the transaction to preserve
    /// serializability. The call had no effect and may be reissued.
    pub fn is_serialization_failure(&self) -> bool {
        match self {
            LedgerError::Storage(sqlx::Error::Database(db_err)) => {
                db_err.code().as_deref() == Some(SQLSTATE_SERIALIZATION_FAILURE)
            }
            _ => false,
        }
    }

    /// True when the server cancelled a statement because the
    /// `statement_timeout` or `lock_timeout` set from the deadline ran out.
    fn is_server_timeout(&self) -> bool {
        match self {
            LedgerError::Storage(sqlx::Error::Database(db_err)) => matches!(
                db_err.code().as_deref(),
                Some(SQLSTATE_QUERY_CANCELED | SQLSTATE_LOCK_NOT_AVAILABLE)
            ),
            _ => false,
        }
    }
}

/// Result of the select-next transaction body.
enum Selection {
    AlreadyPlaying(String),
    Empty,
    Promoted(Vec<BidRecord>),
}

/// Isolation statement for transactions whose reads decide their writes.
const SERIALIZABLE: &str = "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE";

/// Transactional front door to the `bids` table.
///
/// Cheap to clone; clones share the underlying pool.
#[derive(Debug, Clone)]
pub struct BidLedger {
    pool: PgPool,
    op_timeout: Duration,
}

impl BidLedger {
    /// Build a ledger over `pool`. `op_timeout` is used by [`Self::deadline`].
    pub fn new(pool: PgPool, op_timeout: Duration) -> Self {
        Self { pool, op_timeout }
    }

    /// A deadline `op_timeout` from now, for callers without their own.
    pub fn deadline(&self) -> Deadline {
        Deadline::now() + self.op_timeout
    }

    /// Record a new queued bid and return its id.
    pub async fn record_bid(
        &self,
        body: &CreateBid,
        deadline: Deadline,
    ) -> Result<BidId, LedgerError> {
        validate_new_bid(body.bid_amount, &body.song_id)?;

        let bid_id = uuid::Uuid::new_v4();
        let now = Utc::now();
        let body = body.clone();

        let record = self
            .transaction("record_bid", deadline, None, move |conn| {
                Box::pin(async move { BidRepo::create(conn, bid_id, &body, now).await })
            })
            .await?;

        tracing::info!(
            bid_id = %record.bid_id,
            song_id = %record.song_id,
            bid_amount = record.bid_amount,
            "Bid recorded",
        );
        Ok(record.bid_id)
    }

    /// Every bid in insertion order, optionally filtered to one status.
    pub async fn list_bids(
        &self,
        status: Option<SongStatus>,
        deadline: Deadline,
    ) -> Result<Vec<BidRecord>, LedgerError> {
        let status: Option<StatusId> = status.map(SongStatus::id);
        self.transaction("list_bids", deadline, None, move |conn| {
            Box::pin(BidRepo::list(conn, status))
        })
        .await
    }

    /// Total queued amount per song, highest first. Order among equal
    /// totals is unspecified.
    pub async fn rank_queued_songs(
        &self,
        deadline: Deadline,
    ) -> Result<Vec<AggregateRanking>, LedgerError> {
        self.transaction("rank_queued_songs", deadline, None, |conn| {
            Box::pin(BidRepo::rank_queued(conn))
        })
        .await
    }

    /// Pick the top-ranked queued song and move all of its queued bids to
    /// `Playing` in one serializable transaction.
    ///
    /// Returns the moved rows, or an empty vector when nothing is queued.
    /// Fails with [`CoreError::Conflict`] while another song is still
    /// playing; finalize it first.
    pub async fn select_and_play_next_song(
        &self,
        deadline: Deadline,
    ) -> Result<Vec<BidRecord>, LedgerError> {
        let now = Utc::now();
        let selection = self
            .transaction(
                "select_and_play_next_song",
                deadline,
                Some(SERIALIZABLE),
                move |conn| Box::pin(select_and_promote(conn, now)),
            )
            .await?;

        match selection {
            Selection::Promoted(rows) => {
                let total: i64 = rows.iter().map(|r| r.bid_amount).sum();
                if let Some(first) = rows.first() {
                    tracing::info!(
                        song_id = %first.song_id,
                        bid_count = rows.len(),
                        total_bid_amount = total,
                        "Song now playing",
                    );
                }
                Ok(rows)
            }
            Selection::Empty => {
                tracing::debug!("No queued bids, nothing to play");
                Ok(Vec::new())
            }
            Selection::AlreadyPlaying(song_id) => {
                tracing::warn!(%song_id, "Refusing to select next song while one is playing");
                Err(CoreError::Conflict(format!(
                    "Song '{song_id}' is still playing; finalize it before selecting the next song"
                ))
                .into())
            }
        }
    }

    /// Move every `Playing` row to `Finalized`. Returns the moved rows,
    /// empty when nothing was playing.
    pub async fn finalize_current_song(
        &self,
        deadline: Deadline,
    ) -> Result<Vec<BidRecord>, LedgerError> {
        let now = Utc::now();
        let rows = self
            .transaction("finalize_current_song", deadline, None, move |conn| {
                Box::pin(BidRepo::transition_all(
                    conn,
                    SongStatus::Playing,
                    SongStatus::Finalized,
                    now,
                ))
            })
            .await?;

        match rows.first() {
            Some(first) => tracing::info!(
                song_id = %first.song_id,
                bid_count = rows.len(),
                "Song finalized",
            ),
            None => tracing::debug!("No song playing, nothing to finalize"),
        }
        Ok(rows)
    }

    /// Delete every bid. Administrative / test isolation use only.
    pub async fn reset_all(&self, deadline: Deadline) -> Result<(), LedgerError> {
        let deleted = self
            .transaction("reset_all", deadline, None, |conn| {
                Box::pin(BidRepo::delete_all(conn))
            })
            .await?;

        tracing::warn!(deleted, "Cleared all rows from the bid ledger");
        Ok(())
    }

    /// Run `body` in a transaction bounded by `deadline`.
    ///
    /// `isolation`, when given, is the first statement of the transaction.
    /// The transaction commits when `body` succeeds and rolls back when it
    /// fails; both happen before the deadline or not at all.
    async fn transaction<T, F>(
        &self,
        operation: &'static str,
        deadline: Deadline,
        isolation: Option<&'static str>,
        body: F,
    ) -> Result<T, LedgerError>
    where
        F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T, sqlx::Error>>,
    {
        let mut conn = timed(operation, deadline, self.pool.acquire()).await?;

        let work = async {
            let mut tx = conn.begin().await?;
            if let Some(statement) = isolation {
                sqlx::query(statement).execute(&mut *tx).await?;
            }
            set_server_timeouts(&mut tx, deadline).await?;

            let result: Result<T, sqlx::Error> = match body(&mut *tx).await {
                Ok(value) => {
                    tx.commit().await?;
                    Ok(value)
                }
                Err(e) => {
                    if let Err(rollback) = tx.rollback().await {
                        tracing::error!(
                            operation,
                            error = %rollback,
                            "Failed to roll back ledger transaction",
                        );
                    }
                    Err(e)
                }
            };
            result
        };

        let outcome = timed(operation, deadline, work).await;
        match outcome {
            Err(LedgerError::Timeout { operation }) => {
                abandon(conn, operation);
                Err(LedgerError::Timeout { operation })
            }
            Err(e) if e.is_server_timeout() => {
                tracing::warn!(operation, error = %e, "Database cancelled ledger statement");
                Err(LedgerError::Timeout { operation })
            }
            other => other,
        }
    }
}

/// Body of the select-next transaction. Runs after the isolation level has
/// been set, so the guard and the promotion see one snapshot.
async fn select_and_promote(
    conn: &mut PgConnection,
    now: Timestamp,
) -> Result<Selection, sqlx::Error> {
    if let Some(song_id) = BidRepo::find_playing_song(conn).await? {
        return Ok(Selection::AlreadyPlaying(song_id));
    }

    let Some(top) = BidRepo::top_queued(conn).await? else {
        return Ok(Selection::Empty);
    };

    let rows = BidRepo::transition_song(
        conn,
        &top.song_id,
        SongStatus::Queued,
        SongStatus::Playing,
        now,
    )
    .await?;
    Ok(Selection::Promoted(rows))
}

/// Bound every later statement of the current transaction on the server by
/// the time left until `deadline`.
async fn set_server_timeouts(conn: &mut PgConnection, deadline: Deadline) -> Result<(), sqlx::Error> {
    // Zero disables both settings, so never send less than 1ms.
    let remaining_ms = deadline
        .saturating_duration_since(Deadline::now())
        .as_millis()
        .max(1);
    sqlx::query(
        "SELECT set_config('statement_timeout', $1, true), \
                set_config('lock_timeout', $1, true)",
    )
    .bind(format!("{remaining_ms}ms"))
    .execute(conn)
    .await?;
    Ok(())
}

/// Run `fut` under `deadline`, converting expiry into [`LedgerError::Timeout`].
async fn timed<T, F, E>(operation: &'static str, deadline: Deadline, fut: F) -> Result<T, LedgerError>
where
    F: Future<Output = Result<T, E>>,
    LedgerError: From<E>,
{
    // `timeout_at` polls the inner future once before checking the clock.
    if Deadline::now() >= deadline {
        tracing::warn!(operation, "Ledger operation started after its deadline");
        return Err(LedgerError::Timeout { operation });
    }
    match tokio::time::timeout_at(deadline, fut).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            tracing::warn!(operation, "Ledger operation exceeded its deadline");
            Err(LedgerError::Timeout { operation })
        }
    }
}

/// Take a connection whose transaction was cut off out of the pool and close
/// it. The server aborts the open transaction when the session ends.
fn abandon(conn: PoolConnection<Postgres>, operation: &'static str) {
    tracing::warn!(operation, "Closing connection of abandoned ledger transaction");
    drop(conn.detach());
}
