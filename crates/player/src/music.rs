//! Music service playback control.
//!
//! Only two calls are needed by the playback loop: whether the user's
//! player is currently playing, and starting a track by URI.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::credentials::{CredentialError, CredentialProvider};

#[derive(Debug, thiserror::Error)]
pub enum MusicError {
    #[error(transparent)]
    Credentials(#[from] CredentialError),

    #[error("Music service request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Music service returned {status}: {body}")]
    Api { status: u16, body: String },
}

#[async_trait]
pub trait MusicPlayer: Send + Sync {
    async fn is_playing(&self) -> Result<bool, MusicError>;

    /// Start playing `track_uri` on the active device, replacing whatever
    /// was queued there.
    async fn play(&self, track_uri: &str) -> Result<(), MusicError>;
}

#[derive(Debug, Deserialize)]
struct PlaybackState {
    is_playing: bool,
}

/// [`MusicPlayer`] for the Spotify Web API.
pub struct SpotifyPlayer {
    http: reqwest::Client,
    api_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl SpotifyPlayer {
    pub fn new(
        http: reqwest::Client,
        api_url: String,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            http,
            api_url,
            credentials,
        }
    }

    /// Turn a non-success response into [`MusicError::Api`]. A 401 also
    /// drops the cached token so the next call fetches a fresh one.
    async fn reject(&self, response: reqwest::Response) -> MusicError {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("Music service rejected access token, invalidating");
            self.credentials.invalidate().await;
        }
        let body = response.text().await.unwrap_or_default();
        MusicError::Api {
            status: status.as_u16(),
            body,
        }
    }
}

#[async_trait]
impl MusicPlayer for SpotifyPlayer {
    async fn is_playing(&self) -> Result<bool, MusicError> {
        let token = self.credentials.access_token().await?;
        let response = self
            .http
            .get(format!("{}/me/player", self.api_url))
            .header(reqwest::header::AUTHORIZATION, token.authorization_header())
            .send()
            .await?;

        // No active device.
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(self.reject(response).await);
        }

        let state: PlaybackState = response.json().await?;
        Ok(state.is_playing)
    }

    async fn play(&self, track_uri: &str) -> Result<(), MusicError> {
        let token = self.credentials.access_token().await?;
        let response = self
            .http
            .put(format!("{}/me/player/play", self.api_url))
            .header(reqwest::header::AUTHORIZATION, token.authorization_header())
            .json(&serde_json::json!({ "uris": [track_uri] }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.reject(response).await);
        }

        tracing::debug!(track_uri, "Playback started");
        Ok(())
    }
}
