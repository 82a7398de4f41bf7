//! Error handling module for prefapply
//!
//! Only failures that abort the program before the engine starts live here
//! (catalog loading, platform precondition). Per-command failures are a
//! separate taxonomy in `command_executor::CommandFailure` and are never
//! propagated out of the engine.

use thiserror::Error;

/// Main error type for prefapply
#[derive(Error, Debug)]
pub enum PrefApplyError {
    /// IO errors (catalog files, backup directory)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catalog integrity errors (malformed settings, bad type flags)
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Not running on the operating system the preference store belongs to
    #[error("Unsupported platform: {0} (only macOS is supported)")]
    UnsupportedPlatform(String),
}

/// Result type alias for prefapply operations
pub type Result<T> = std::result::Result<T, PrefApplyError>;

impl PrefApplyError {
    /// Create a catalog error
    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::Catalog(msg.into())
    }
}
