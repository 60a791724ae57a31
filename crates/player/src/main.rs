//! `songbid-player` -- jukebox playback daemon.
//!
//! Polls the music service and, whenever the player goes idle, finalizes
//! the current song in the bid ledger and starts the next top-ranked one.
//! See [`songbid_player::config::PlayerConfig::from_env`] for the
//! environment variables it reads.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use songbid_player::config::PlayerConfig;
use songbid_player::credentials::{ClientCredentials, FileTokenStore, OAuthCredentialProvider};
use songbid_player::driver::PlaybackDriver;
use songbid_player::ledger_client::LedgerClient;
use songbid_player::music::SpotifyPlayer;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "songbid_player=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = PlayerConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid player configuration");
        std::process::exit(1);
    });

    tracing::info!(
        songbid_api_url = %config.songbid_api_url,
        music_api_url = %config.music_api_url,
        token_file = %config.token_file.display(),
        poll_interval_secs = config.poll_interval.as_secs(),
        "Starting songbid-player",
    );

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to build HTTP client");
            std::process::exit(1);
        });

    let credentials = Arc::new(OAuthCredentialProvider::new(
        http.clone(),
        config.music_accounts_url.clone(),
        ClientCredentials {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        },
        Arc::new(FileTokenStore::new(config.token_file.clone())),
    ));
    let player = Arc::new(SpotifyPlayer::new(
        http.clone(),
        config.music_api_url.clone(),
        credentials,
    ));
    let queue = Arc::new(LedgerClient::new(http, config.songbid_api_url.clone()));

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received SIGINT (Ctrl-C), shutting down");
        }
        signal_cancel.cancel();
    });

    PlaybackDriver::new(queue, player)
        .run(config.poll_interval, cancel)
        .await;

    tracing::info!("songbid-player stopped");
}
