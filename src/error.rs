//! Error types for the songfeed client.

use thiserror::Error;

/// Main error type for all songfeed operations.
///
/// The first four variants are the request outcomes callers match on:
/// `AuthRequired` and `SessionExpired` mean "send the user to login",
/// `Network` is retryable, and `Domain` carries a message worth displaying.
#[derive(Debug, Error)]
pub enum SongfeedError {
    /// No access token is available; the user has to log in.
    #[error("Authentication required")]
    AuthRequired,

    /// The token could not be refreshed, or the retried request was still
    /// unauthorized. Credentials have been cleared.
    #[error("Session expired")]
    SessionExpired,

    /// No HTTP response was received.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-2xx status other than 401.
    #[error("API error ({status}): {message}")]
    Domain { status: u16, message: String },

    /// JSON parsing failed.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Credential storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Invalid configuration value.
    #[error("Config error: {0}")]
    Config(String),
}

impl SongfeedError {
    /// Whether the caller should send the user back to the login screen.
    pub fn requires_login(&self) -> bool {
        matches!(self, SongfeedError::AuthRequired | SongfeedError::SessionExpired)
    }
}

/// Result type alias for songfeed operations.
pub type Result<T> = std::result::Result<T, SongfeedError>;
