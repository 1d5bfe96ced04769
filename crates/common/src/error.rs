//! Error types shared across Recast crates.

use std::path::PathBuf;

/// Top-level error type for Recast operations.
#[derive(Debug, thiserror::Error)]
pub enum RecastError {
    #[error("Probe error: {message}")]
    Probe { message: String },

    #[error("Transcode error: {message}")]
    Transcode { message: String },

    #[error("Compose error: {message}")]
    Compose { message: String },

    #[error("Queue error: {message}")]
    Queue { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Timed out: {message}")]
    Timeout { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using RecastError.
pub type RecastResult<T> = Result<T, RecastError>;

impl RecastError {
    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe {
            message: msg.into(),
        }
    }

    pub fn transcode(msg: impl Into<String>) -> Self {
        Self::Transcode {
            message: msg.into(),
        }
    }

    pub fn compose(msg: impl Into<String>) -> Self {
        Self::Compose {
            message: msg.into(),
        }
    }

    pub fn queue(msg: impl Into<String>) -> Self {
        Self::Queue {
            message: msg.into(),
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout {
            message: msg.into(),
        }
    }
}
