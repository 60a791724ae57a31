//! Repository for the `bids` table.
//!
//! Every function takes a bare connection so the ledger decides the
//! transaction boundary. Status updates always filter on the predecessor
//! status, which keeps transitions monotonic at the SQL level.

use sqlx::PgConnection;
use songbid_core::types::{BidId, Timestamp};

use crate::models::bid::{AggregateRanking, BidRecord, CreateBid};
use crate::models::status::{SongStatus, StatusId};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "bid_id, song_id, bid_amount, song_status, created_at, updated_at";

/// Aggregate queued bids per song, highest total first.
///
/// Tied totals come back in whatever order the engine produces; callers
/// must not rely on it.
const RANK_QUEUED: &str = "SELECT song_id, SUM(bid_amount)::BIGINT AS total_bid_amount \
     FROM bids \
     WHERE song_status = $1 \
     GROUP BY song_id \
     ORDER BY total_bid_amount DESC";

/// Provides the SQL operations behind [`BidLedger`](crate::ledger::BidLedger).
pub struct BidRepo;

impl BidRepo {
    /// Insert a new queued bid, returning the created row.
    pub async fn create(
        conn: &mut PgConnection,
        bid_id: BidId,
        body: &CreateBid,
        now: Timestamp,
    ) -> Result<BidRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO bids (bid_id, song_id, bid_amount, song_status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BidRecord>(&query)
            .bind(bid_id)
            .bind(&body.song_id)
            .bind(body.bid_amount)
            .bind(SongStatus::Queued.id())
            .bind(now)
            .fetch_one(conn)
            .await
    }

    /// List bids in insertion order, optionally restricted to one status.
    pub async fn list(
        conn: &mut PgConnection,
        status: Option<StatusId>,
    ) -> Result<Vec<BidRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM bids \
             WHERE ($1::SMALLINT IS NULL OR song_status = $1) \
             ORDER BY created_at, bid_id"
        );
        sqlx::query_as::<_, BidRecord>(&query)
            .bind(status)
            .fetch_all(conn)
            .await
    }

    /// Rank every song that has queued bids.
    pub async fn rank_queued(conn: &mut PgConnection) -> Result<Vec<AggregateRanking>, sqlx::Error> {
        sqlx::query_as::<_, AggregateRanking>(RANK_QUEUED)
            .bind(SongStatus::Queued.id())
            .fetch_all(conn)
            .await
    }

    /// The single top-ranked queued song, if any bids are queued.
    pub async fn top_queued(
        conn: &mut PgConnection,
    ) -> Result<Option<AggregateRanking>, sqlx::Error> {
        let query = format!("{RANK_QUEUED} LIMIT 1");
        sqlx::query_as::<_, AggregateRanking>(&query)
            .bind(SongStatus::Queued.id())
            .fetch_optional(conn)
            .await
    }

    /// The song currently marked playing, if any.
    pub async fn find_playing_song(conn: &mut PgConnection) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT song_id FROM bids WHERE song_status = $1 LIMIT 1")
                .bind(SongStatus::Playing.id())
                .fetch_optional(conn)
                .await?;
        Ok(row.map(|(song_id,)| song_id))
    }

    /// Move every row of `song_id` from `from` to `to`, stamping one shared
    /// `updated_at`. Returns the moved rows in insertion order.
    pub async fn transition_song(
        conn: &mut PgConnection,
        song_id: &str,
        from: SongStatus,
        to: SongStatus,
        now: Timestamp,
    ) -> Result<Vec<BidRecord>, sqlx::Error> {
        debug_assert_eq!(to.predecessor(), Some(from));
        let query = format!(
            "UPDATE bids SET song_status = $3, updated_at = $4 \
             WHERE song_id = $1 AND song_status = $2 \
             RETURNING {COLUMNS}"
        );
        let rows = sqlx::query_as::<_, BidRecord>(&query)
            .bind(song_id)
            .bind(from.id())
            .bind(to.id())
            .bind(now)
            .fetch_all(conn)
            .await?;
        Ok(in_insertion_order(rows))
    }

    /// Move every row in `from` to `to`, regardless of song.
    pub async fn transition_all(
        conn: &mut PgConnection,
        from: SongStatus,
        to: SongStatus,
        now: Timestamp,
    ) -> Result<Vec<BidRecord>, sqlx::Error> {
        debug_assert_eq!(to.predecessor(), Some(from));
        let query = format!(
            "UPDATE bids SET song_status = $2, updated_at = $3 \
             WHERE song_status = $1 \
             RETURNING {COLUMNS}"
        );
        let rows = sqlx::query_as::<_, BidRecord>(&query)
            .bind(from.id())
            .bind(to.id())
            .bind(now)
            .fetch_all(conn)
            .await?;
        Ok(in_insertion_order(rows))
    }

    /// Delete every bid. Returns the number of rows removed.
    pub async fn delete_all(conn: &mut PgConnection) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM bids").execute(conn).await?;
        Ok(result.rows_affected())
    }
}

/// `RETURNING` has no defined order; sort to match [`BidRepo::list`].
fn in_insertion_order(mut rows: Vec<BidRecord>) -> Vec<BidRecord> {
    rows.sort_by(|a, b| (a.created_at, a.bid_id).cmp(&(b.created_at, b.bid_id)));
    rows
}
