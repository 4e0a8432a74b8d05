//! Shared error types for the services crate.

use thiserror::Error;

/// Errors emitted while opening an extraction stream.
///
/// A session that fails to open never reaches `Streaming`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StreamClientError {
    #[error("not signed in")]
    MissingCredentials,
    #[error("invalid stream url: {0}")]
    InvalidUrl(String),
    #[error("stream connection failed: {0}")]
    Connect(String),
}

/// Errors emitted while reading configuration from the environment.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}
