//! Shared domain types for the song-bid jukebox.
//!
//! Kept free of database and HTTP dependencies so every other crate
//! (ledger, API server, playback driver) can depend on it.

pub mod bid;
pub mod error;
pub mod types;
