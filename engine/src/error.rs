//! Error types for the Rover engine.

use thiserror::Error;

/// All possible errors from the Rover engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Preference errors
    #[error("type mismatch for preference '{key}': expected {expected}, got {got}")]
    PreferenceType {
        key: String,
        expected: String,
        got: String,
    },

    #[error("storage failure: {0}")]
    Storage(String),

    // State errors
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("snapshot format mismatch: expected {expected}, got {actual}")]
    SnapshotFormatMismatch { expected: u32, actual: u32 },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
