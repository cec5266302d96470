//! Error types for the load runner.
//!
//! Only [`ConfigError`] ever leaves the runner. [`RequestError`] is recorded
//! inside a failed check and stays with the virtual user that produced it.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using ConfigError.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Invalid run parameters. Fatal: returned before any request is issued.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("target_url is required")]
    MissingTargetUrl,

    #[error("Invalid target_url '{url}': {reason}")]
    InvalidTargetUrl { url: String, reason: String },

    #[error("Unsupported scheme '{0}' in target_url (expected http or https)")]
    UnsupportedScheme(String),

    #[error("virtual_users must be > 0")]
    ZeroVirtualUsers,

    #[error("{field} must be > 0")]
    ZeroDuration { field: &'static str },

    #[error("Invalid duration for '{field}': '{value}'")]
    InvalidDuration { field: &'static str, value: String },

    #[error("Failed to read scenario file {}: {source}", path.display())]
    ScenarioRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse scenario file {}: {source}", path.display())]
    ScenarioParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

impl ConfigError {
    /// Name of the configuration field responsible for this error.
    pub fn field(&self) -> &'static str {
        match self {
            ConfigError::MissingTargetUrl
            | ConfigError::InvalidTargetUrl { .. }
            | ConfigError::UnsupportedScheme(_) => "target_url",
            ConfigError::ZeroVirtualUsers => "virtual_users",
            ConfigError::ZeroDuration { field } | ConfigError::InvalidDuration { field, .. } => {
                *field
            }
            ConfigError::ScenarioRead { .. } | ConfigError::ScenarioParse { .. } => "scenario",
            ConfigError::HttpClient(_) => "http_client",
        }
    }
}

/// Failure of a single request. Always absorbed into the failed count.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected status code {0}")]
    UnexpectedStatus(u16),

    #[error("Failed to read response body: {0}")]
    Body(String),
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RequestError::Timeout
        } else if err.is_connect() {
            RequestError::Connect(err.to_string())
        } else if err.is_body() || err.is_decode() {
            RequestError::Body(err.to_string())
        } else {
            RequestError::Transport(err.to_string())
        }
    }
}
