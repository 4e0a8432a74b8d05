use std::env;
use std::time::Duration;

use crate::error::ConfigError;
use crate::stream::Credentials;

pub const DEFAULT_API_BASE_URL: &str = "https://mini-api-worker.dachein-x.workers.dev";
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(600);
pub const DEFAULT_REVEAL_THRESHOLD: usize = 2;

/// Cadence and gating of the reveal pacer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RevealConfig {
    /// Time between pacer ticks.
    pub tick_interval: Duration,
    /// An item is first shown once its answer is longer than this many characters.
    pub reveal_threshold: usize,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            reveal_threshold: DEFAULT_REVEAL_THRESHOLD,
        }
    }
}

impl RevealConfig {
    /// Read `PIECE_REVEAL_TICK_MS` and `PIECE_REVEAL_THRESHOLD`, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for unparsable or zero tick values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`RevealConfig::from_env`] with an injectable variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for unparsable or zero tick values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup("PIECE_REVEAL_TICK_MS") {
            let millis = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or(ConfigError::InvalidValue {
                    key: "PIECE_REVEAL_TICK_MS",
                    value: raw.clone(),
                })?;
            config.tick_interval = Duration::from_millis(millis);
        }

        if let Some(raw) = lookup("PIECE_REVEAL_THRESHOLD") {
            config.reveal_threshold =
                raw.trim()
                    .parse::<usize>()
                    .map_err(|_| ConfigError::InvalidValue {
                        key: "PIECE_REVEAL_THRESHOLD",
                        value: raw.clone(),
                    })?;
        }

        Ok(config)
    }
}

/// Where the backend lives and how to authenticate against it.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.into(),
            token: None,
        }
    }
}

impl ApiConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = lookup("PIECE_API_BASE_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.into());
        let token = lookup("PIECE_API_TOKEN").filter(|token| !token.trim().is_empty());
        Self { base_url, token }
    }

    /// Stream credentials, if a token is configured.
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials> {
        self.token.as_deref().and_then(Credentials::bearer)
    }
}
