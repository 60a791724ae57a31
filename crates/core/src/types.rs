/// Bid primary keys are random UUIDs assigned by the ledger on insert.
pub type BidId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
