//! Error types for the media-relay application.

use std::fmt;

use thiserror::Error;

/// Main error type for the application.
///
/// Only resolution and configuration problems surface through this type.
/// Per-item transfer problems are reported as [`TransferFailure`] values and
/// never abort a run.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration value for '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    // Resolution errors
    #[error("Resolution failed: {0}")]
    Resolution(String),

    #[error("Share link has expired: {0}")]
    ExpiredLink(String),

    #[error("Parser service error {code}: {msg}")]
    ParserService { code: i64, msg: String },

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // URL parsing errors
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a single fetch or upload gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    Transport,
    HttpStatus(u16),
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Transport => write!(f, "transport error"),
            FailureKind::HttpStatus(code) => write!(f, "HTTP {}", code),
            FailureKind::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Item-level failure of a fetch or upload after all attempts were used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct TransferFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl TransferFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(FailureKind::Cancelled, "transfer cancelled")
    }

    pub fn status(code: u16) -> Self {
        Self::new(FailureKind::HttpStatus(code), format!("unexpected status {}", code))
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == FailureKind::Cancelled
    }
}

impl From<reqwest::Error> for TransferFailure {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            FailureKind::Timeout
        } else if let Some(status) = err.status() {
            FailureKind::HttpStatus(status.as_u16())
        } else {
            FailureKind::Transport
        };
        Self::new(kind, err.to_string())
    }
}

/// Process exit codes.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const ABORT: i32 = 1;
    pub const RESOLUTION_ERROR: i32 = 2;
    pub const CONFIG_ERROR: i32 = 3;
    pub const UNEXPECTED_ERROR: i32 = 5;
    pub const EXPIRED_LINK: i32 = 7;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_display() {
        assert_eq!(FailureKind::HttpStatus(404).to_string(), "HTTP 404");
        assert_eq!(FailureKind::Timeout.to_string(), "timeout");
    }

    #[test]
    fn test_transfer_failure_status() {
        let failure = TransferFailure::status(503);
        assert_eq!(failure.kind, FailureKind::HttpStatus(503));
        assert!(!failure.is_cancelled());
        assert!(TransferFailure::cancelled().is_cancelled());
    }
}
