use std::path::PathBuf;
use std::time::Duration;

/// Errors raised while reading player configuration.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{var} must be a positive integer, got {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Playback daemon configuration.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Base URL of the bid server API, without trailing slash.
    pub songbid_api_url: String,
    /// Base URL of the music service Web API.
    pub music_api_url: String,
    /// Base URL of the music service accounts (token) service.
    pub music_accounts_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// Where the most recent access token is persisted.
    pub token_file: PathBuf,
    pub poll_interval: Duration,
    pub http_timeout: Duration,
}

impl PlayerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var               | Required | Default                          |
    /// |-----------------------|----------|----------------------------------|
    /// | `SONGBID_API_URL`     | no       | `http://localhost:5050/api/v1`   |
    /// | `MUSIC_API_URL`       | no       | `https://api.spotify.com/v1`     |
    /// | `MUSIC_ACCOUNTS_URL`  | no       | `https://accounts.spotify.com`   |
    /// | `MUSIC_CLIENT_ID`     | yes      | --                               |
    /// | `MUSIC_CLIENT_SECRET` | yes      | --                               |
    /// | `TOKEN_FILE`          | no       | `.spotify-token.json`            |
    /// | `POLL_INTERVAL_SECS`  | no       | `1`                              |
    /// | `HTTP_TIMEOUT_SECS`   | no       | `30`                             |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = |var: &str, default: &str| {
            lookup(var)
                .unwrap_or_else(|| default.to_string())
                .trim_end_matches('/')
                .to_string()
        };
        let required = |var: &'static str| {
            lookup(var)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(var))
        };
        let secs = |var: &'static str, default: u64| -> Result<Duration, ConfigError> {
            match lookup(var) {
                None => Ok(Duration::from_secs(default)),
                Some(value) => match value.trim().parse::<u64>() {
                    Ok(n) if n > 0 => Ok(Duration::from_secs(n)),
                    _ => Err(ConfigError::Invalid { var, value }),
                },
            }
        };

        Ok(Self {
            songbid_api_url: url("SONGBID_API_URL", "http://localhost:5050/api/v1"),
            music_api_url: url("MUSIC_API_URL", "https://api.spotify.com/v1"),
            music_accounts_url: url("MUSIC_ACCOUNTS_URL", "https://accounts.spotify.com"),
            client_id: required("MUSIC_CLIENT_ID")?,
            client_secret: required("MUSIC_CLIENT_SECRET")?,
            token_file: lookup("TOKEN_FILE")
                .unwrap_or_else(|| ".spotify-token.json".into())
                .into(),
            poll_interval: secs("POLL_INTERVAL_SECS", 1)?,
            http_timeout: secs("HTTP_TIMEOUT_SECS", 30)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_credentials_set() {
        let config = PlayerConfig::from_lookup(lookup(&[
            ("MUSIC_CLIENT_ID", "id"),
            ("MUSIC_CLIENT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.songbid_api_url, "http://localhost:5050/api/v1");
        assert_eq!(config.music_api_url, "https://api.spotify.com/v1");
        assert_eq!(config.token_file, PathBuf::from(".spotify-token.json"));
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.http_timeout, Duration::from_secs(30));
    }

    #[test]
    fn missing_client_secret_is_an_error() {
        let err = PlayerConfig::from_lookup(lookup(&[("MUSIC_CLIENT_ID", "id")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("MUSIC_CLIENT_SECRET"));
    }

    #[test]
    fn trailing_slash_is_stripped_from_urls() {
        let config = PlayerConfig::from_lookup(lookup(&[
            ("MUSIC_CLIENT_ID", "id"),
            ("MUSIC_CLIENT_SECRET", "secret"),
            ("SONGBID_API_URL", "http://bids.local/api/v1/"),
        ]))
        .unwrap();
        assert_eq!(config.songbid_api_url, "http://bids.local/api/v1");
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let err = PlayerConfig::from_lookup(lookup(&[
            ("MUSIC_CLIENT_ID", "id"),
            ("MUSIC_CLIENT_SECRET", "secret"),
            ("POLL_INTERVAL_SECS", "0"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                var: "POLL_INTERVAL_SECS",
                value: "0".into()
            }
        );
    }
}
