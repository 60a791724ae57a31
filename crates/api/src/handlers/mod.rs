pub mod admin;
pub mod bids;
pub mod player;
