//! Echo-Mesh: a mutual-follow graph crawler
//!
//! This crate crawls outward from a seed artist on an audio-sharing platform and
//! builds a directed graph of confirmed mutual follows. The crawl is prioritised by
//! encounter counts, rate limited, and resumable from a persisted graph.

pub mod config;
pub mod crawler;
pub mod directory;
pub mod graph;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Echo-Mesh operations
#[derive(Debug, Error)]
pub enum EchoError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("{operation} failed permanently after {attempts} attempts: {last_error}")]
    PermanentFailure {
        operation: String,
        attempts: u32,
        last_error: DirectoryError,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Invalid state transition for artist {artist}: {from:?} -> {to:?}")]
    InvalidTransition {
        artist: graph::ArtistId,
        from: state::CandidateState,
        to: state::CandidateState,
    },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session error: {0}")]
    Session(String),
}

impl EchoError {
    /// Returns true if this error marks a remote call that exhausted its retries
    pub fn is_permanent_failure(&self) -> bool {
        matches!(self, Self::PermanentFailure { .. })
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors reported by the remote artist directory
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Rate limited by {url}")]
    RateLimited { url: String },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unexpected pagination cursor: {0}")]
    CursorParse(String),

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl DirectoryError {
    /// Returns true for failures worth retrying (network, 429, 5xx)
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { source, .. } => !source.is_builder(),
            Self::RateLimited { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            Self::NotFound(_) | Self::CursorParse(_) | Self::Decode { .. } => false,
        }
    }
}

/// Result type alias for Echo-Mesh operations
pub type Result<T> = std::result::Result<T, EchoError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for directory operations
pub type DirectoryResult<T> = std::result::Result<T, DirectoryError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{resume_session, start_new_session, Orchestrator};
pub use graph::{ArtistId, ArtistRecord, SocialGraph};
pub use state::CandidateState;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(DirectoryError::RateLimited {
            url: "u".to_string()
        }
        .is_transient());
        assert!(DirectoryError::Status {
            url: "u".to_string(),
            status: 503
        }
        .is_transient());
        assert!(!DirectoryError::Status {
            url: "u".to_string(),
            status: 403
        }
        .is_transient());
        assert!(!DirectoryError::CursorParse("abc".to_string()).is_transient());
        assert!(!DirectoryError::NotFound("users/1".to_string()).is_transient());
    }

    #[test]
    fn test_permanent_failure_flag() {
        let err = EchoError::PermanentFailure {
            operation: "fetch profile 1".to_string(),
            attempts: 3,
            last_error: DirectoryError::RateLimited {
                url: "u".to_string(),
            },
        };
        assert!(err.is_permanent_failure());
        assert!(!EchoError::Session("x".to_string()).is_permanent_failure());
    }
}
