//! Error types for hmsearch.

use thiserror::Error;

/// Errors that can occur during index operations.
#[derive(Debug, Error)]
pub enum HmError {
    /// Rejected database configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Malformed caller input (wrong hash length, bad hex).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// `init` was called on a database that already contains records.
    #[error("cannot initialise non-empty database")]
    NotEmpty,

    /// The settings records could not be read or parsed on open.
    #[error("missing or corrupt settings: {0}")]
    SettingsMissing(String),

    /// Operation invoked on a closed handle.
    #[error("database is closed")]
    Closed,

    /// Opaque failure propagated from the storage backend.
    #[error("backend error: {0}")]
    Backend(String),

    /// I/O error from the file backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for hmsearch operations.
pub type Result<T> = std::result::Result<T, HmError>;
