//! Error types shared across Tilawa crates.

use std::path::PathBuf;

/// Top-level error type for Tilawa operations.
#[derive(Debug, thiserror::Error)]
pub enum TilawaError {
    #[error("Probe error: {message}")]
    Probe { message: String },

    #[error("Playback error: {message}")]
    Playback { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Export error: {message}")]
    Export { message: String },

    #[error("Project error: {message}")]
    Project { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using TilawaError.
pub type TilawaResult<T> = Result<T, TilawaError>;

impl TilawaError {
    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe {
            message: msg.into(),
        }
    }

    pub fn playback(msg: impl Into<String>) -> Self {
        Self::Playback {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export {
            message: msg.into(),
        }
    }

    pub fn project(msg: impl Into<String>) -> Self {
        Self::Project {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }
}
