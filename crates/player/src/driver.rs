//! The playback loop.
//!
//! Each tick asks the music service whether something is playing. When the
//! player has gone idle the current song is finalized in the ledger, the
//! next song is promoted and the music service is told to play it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::ledger_client::{BidQueue, LedgerClientError};
use crate::music::{MusicError, MusicPlayer};

/// How long a freshly started song may report "not playing" before the
/// driver treats the player as idle.
pub const DEFAULT_START_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The player is busy, or a new song has not had time to start.
    StillPlaying,
    /// Nothing is queued in the ledger.
    QueueEmpty,
    /// A song was promoted in the ledger and started on the player.
    Started { song_id: String, bids: usize },
    /// A song is promoted in the ledger but the player refused to start it.
    /// It is retried on the next idle tick.
    Retrying { song_id: String },
}

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error(transparent)]
    Ledger(#[from] LedgerClientError),

    #[error(transparent)]
    Music(#[from] MusicError),
}

/// Song the driver has promoted to playing in the ledger.
#[derive(Debug, Clone)]
struct CurrentSong {
    song_id: String,
    bids: usize,
    /// Set once the player accepted the play request.
    started_at: Option<Instant>,
    /// Set once the player has reported playing since `started_at`.
    confirmed: bool,
}

pub struct PlaybackDriver {
    queue: Arc<dyn BidQueue>,
    player: Arc<dyn MusicPlayer>,
    current: Option<CurrentSong>,
    start_grace: Duration,
}

impl PlaybackDriver {
    pub fn new(queue: Arc<dyn BidQueue>, player: Arc<dyn MusicPlayer>) -> Self {
        Self {
            queue,
            player,
            current: None,
            start_grace: DEFAULT_START_GRACE,
        }
    }

    pub fn with_start_grace(mut self, grace: Duration) -> Self {
        self.start_grace = grace;
        self
    }

    /// Run one poll cycle.
    pub async fn tick(&mut self) -> Result<TickOutcome, DriverError> {
        let playing = self.player.is_playing().await?;

        let retry_start = match self.current.as_mut() {
            Some(current) if playing => {
                current.confirmed = true;
                return Ok(TickOutcome::StillPlaying);
            }
            Some(current) => match current.started_at {
                None => true,
                Some(at) if !current.confirmed && at.elapsed() < self.start_grace => {
                    return Ok(TickOutcome::StillPlaying);
                }
                Some(_) => false,
            },
            // Something outside the jukebox is using the player.
            None if playing => return Ok(TickOutcome::StillPlaying),
            None => false,
        };
        if retry_start {
            return self.start_current().await;
        }

        let finalized = self.queue.finalize().await?;
        if let Some(first) = finalized.first() {
            tracing::info!(song_id = %first.song_id, bids = finalized.len(), "Finalized song");
        }
        self.current = None;

        let bids = self.queue.play_next().await?;
        let Some(first) = bids.first() else {
            return Ok(TickOutcome::QueueEmpty);
        };

        self.current = Some(CurrentSong {
            song_id: first.song_id.clone(),
            bids: bids.len(),
            started_at: None,
            confirmed: false,
        });
        self.start_current().await
    }

    /// Ask the player to start the current song.
    async fn start_current(&mut self) -> Result<TickOutcome, DriverError> {
        let Some(current) = self.current.as_mut() else {
            return Ok(TickOutcome::QueueEmpty);
        };

        match self.player.play(&current.song_id).await {
            Ok(()) => {
                current.started_at = Some(Instant::now());
                tracing::info!(song_id = %current.song_id, bids = current.bids, "Started song");
                Ok(TickOutcome::Started {
                    song_id: current.song_id.clone(),
                    bids: current.bids,
                })
            }
            Err(e) => {
                tracing::warn!(
                    song_id = %current.song_id,
                    error = %e,
                    "Player refused to start song, will retry",
                );
                Ok(TickOutcome::Retrying {
                    song_id: current.song_id.clone(),
                })
            }
        }
    }

    /// Poll every `interval` until `cancel` fires.
    ///
    /// Tick errors are logged and the loop carries on; the ledger and the
    /// player are both expected to recover on their own.
    pub async fn run(&mut self, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("Playback driver stopping");
                    break;
                }
                _ = ticker.tick() => {
                    match self.tick().await {
                        Ok(TickOutcome::StillPlaying) => {}
                        Ok(outcome) => tracing::debug!(?outcome, "Tick complete"),
                        Err(e) => tracing::error!(error = %e, "Tick failed"),
                    }
                }
            }
        }
    }
}
