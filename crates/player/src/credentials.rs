//! Music-service credentials.
//!
//! A [`CredentialProvider`] hands out a currently valid [`AccessToken`].
//! [`OAuthCredentialProvider`] implements the refresh contract:
//!
//! 1. return the in-memory token if it has not expired;
//! 2. otherwise load the persisted token from its [`TokenStore`] and use it
//!    if it has not expired;
//! 3. otherwise fetch a new token from the accounts service (refresh-token
//!    grant when a refresh token is known, client-credentials otherwise)
//!    and persist it.
//!
//! A token the music service refused (see [`CredentialProvider::invalidate`])
//! is skipped in steps 1 and 2 until a new one has been fetched.
//!
//! A failure to persist is logged and ignored: the fresh token is still
//! usable for this process.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use songbid_core::types::Timestamp;
use tokio::sync::Mutex;

/// Tokens are treated as expired this many seconds early so a request
/// started just before expiry does not fail mid-flight.
pub const EXPIRY_SKEW_SECS: i64 = 30;

/// An OAuth access token plus the bookkeeping needed to judge its expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    /// Lifetime in seconds from `issued_at`. Absent means non-expiring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// When the token was obtained. Stamped locally on fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<Timestamp>,
}

impl AccessToken {
    /// Whether the token must be replaced before use at `now`.
    ///
    /// A token with a lifetime but no issue time cannot be validated and
    /// counts as expired.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        match (self.expires_in, self.issued_at) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(secs), Some(issued)) => {
                now >= issued + chrono::Duration::seconds(secs - EXPIRY_SKEW_SECS)
            }
        }
    }

    /// Value for the HTTP `Authorization` header.
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

/// Errors from loading, persisting or fetching credentials.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Token store I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Token file {path} is not a valid token: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Token request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Accounts service rejected token request ({status}): {body}")]
    Rejected { status: u16, body: String },
}

// ---------------------------------------------------------------------------
// Token store
// ---------------------------------------------------------------------------

/// Durable home for the most recent token.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// The stored token, or `None` when nothing has been stored yet.
    async fn load(&self) -> Result<Option<AccessToken>, CredentialError>;

    async fn save(&self, token: &AccessToken) -> Result<(), CredentialError>;
}

/// JSON token file on local disk.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<Option<AccessToken>, CredentialError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CredentialError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let token = serde_json::from_slice(&bytes).map_err(|source| CredentialError::Parse {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(token))
    }

    async fn save(&self, token: &AccessToken) -> Result<(), CredentialError> {
        let bytes = serde_json::to_vec_pretty(token).map_err(|source| CredentialError::Parse {
            path: self.path.clone(),
            source,
        })?;
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|source| CredentialError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Source of valid access tokens for music-service calls.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// A token that is valid now, refreshing it if required.
    async fn access_token(&self) -> Result<AccessToken, CredentialError>;

    /// Stop handing out the current token, e.g. after the service answered
    /// 401. The next call fetches a new one.
    async fn invalidate(&self);
}

/// Client registration with the accounts service.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Raw token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
}

/// OAuth token provider backed by a [`TokenStore`].
pub struct OAuthCredentialProvider {
    http: reqwest::Client,
    accounts_url: String,
    client: ClientCredentials,
    store: Arc<dyn TokenStore>,
    state: Mutex<ProviderState>,
}

#[derive(Debug, Default)]
struct ProviderState {
    cached: Option<AccessToken>,
    /// Access token the music service refused. Never handed out again,
    /// even if the token store still holds it.
    rejected: Option<String>,
}

impl ProviderState {
    fn usable(&self, token: &AccessToken, now: Timestamp) -> bool {
        !token.is_expired(now) && self.rejected.as_deref() != Some(token.access_token.as_str())
    }
}

impl OAuthCredentialProvider {
    /// * `accounts_url` - Base URL of the accounts service, e.g.
    ///   `https://accounts.spotify.com`. Tokens are requested from
    ///   `{accounts_url}/api/token`.
    pub fn new(
        http: reqwest::Client,
        accounts_url: String,
        client: ClientCredentials,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            http,
            accounts_url,
            client,
            store,
            state: Mutex::new(ProviderState::default()),
        }
    }

    /// Request a new token. Uses the refresh-token grant when a refresh
    /// token is known so user-scoped tokens keep their scopes.
    async fn fetch(&self, refresh_token: Option<&str>) -> Result<AccessToken, CredentialError> {
        let form: Vec<(&str, &str)> = match refresh_token {
            Some(rt) => vec![("grant_type", "refresh_token"), ("refresh_token", rt)],
            None => vec![("grant_type", "client_credentials")],
        };
        tracing::info!(
            grant_type = form[0].1,
            "Requesting access token from accounts service",
        );

        let response = self
            .http
            .post(format!("{}/api/token", self.accounts_url))
            .basic_auth(&self.client.client_id, Some(&self.client.client_secret))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let raw: TokenResponse = response.json().await?;
        Ok(AccessToken {
            access_token: raw.access_token,
            token_type: raw.token_type,
            expires_in: raw.expires_in,
            // Refresh responses may omit the refresh token; keep the old one.
            refresh_token: raw
                .refresh_token
                .or_else(|| refresh_token.map(str::to_string)),
            issued_at: Some(Utc::now()),
        })
    }
}

#[async_trait]
impl CredentialProvider for OAuthCredentialProvider {
    async fn access_token(&self) -> Result<AccessToken, CredentialError> {
        let mut state = self.state.lock().await;
        let now = Utc::now();

        if let Some(token) = state.cached.as_ref().filter(|t| state.usable(t, now)) {
            return Ok(token.clone());
        }

        let mut refresh_token = state.cached.as_ref().and_then(|t| t.refresh_token.clone());

        match self.store.load().await {
            Ok(Some(token)) if state.usable(&token, now) => {
                tracing::debug!("Loaded access token from store");
                state.cached = Some(token.clone());
                return Ok(token);
            }
            Ok(Some(token)) => {
                tracing::info!("Stored access token expired or rejected, fetching a new one");
                refresh_token = refresh_token.or(token.refresh_token);
            }
            Ok(None) => tracing::info!("No stored access token, fetching a new one"),
            Err(e) => tracing::warn!(error = %e, "Could not read token store, fetching a new token"),
        }

        let token = self.fetch(refresh_token.as_deref()).await?;

        if let Err(e) = self.store.save(&token).await {
            tracing::warn!(error = %e, "Could not persist access token, continuing");
        }

        state.cached = Some(token.clone());
        state.rejected = None;
        Ok(token)
    }

    async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        // The cached copy stays so its refresh token can be used.
        state.rejected = state.cached.as_ref().map(|t| t.access_token.clone());
    }
}
