//! `songbid-player` library crate.
//!
//! The playback side of the jukebox: asks the bid server for the next
//! song, tells the music service to play it, and reports back once it has
//! finished. Re-exports internal modules for integration testing; the
//! binary entrypoint lives in `main.rs`.

pub mod config;
pub mod credentials;
pub mod driver;
pub mod ledger_client;
pub mod music;
