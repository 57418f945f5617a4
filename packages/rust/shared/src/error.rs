//! Error types for DocSimplifier.
//!
//! Library crates use [`DocSimplifierError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all DocSimplifier operations.
#[derive(Debug, thiserror::Error)]
pub enum DocSimplifierError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input validation error (bad URL, bad budget, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The crawl produced zero usable pages.
    #[error("no content found at {url}")]
    NoContent { url: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocSimplifierError>;

impl DocSimplifierError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
