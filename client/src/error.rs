//! Unified error handling for the client.

use crate::config::ConfigError;

/// Client error type.
///
/// The first three variants are the remote failure kinds. Callers show them
/// to the user as their message and otherwise treat them the same.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// No response was received
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-success status
    #[error("Server error {status}: {body}")]
    Server { status: u16, body: String },

    /// A success response whose body is not what was expected
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Engine error: {0}")]
    Engine(#[from] rover_engine::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Another request is already in progress")]
    Busy,
}

impl ClientError {
    /// Whether this is one of the remote failure kinds.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            ClientError::Network(_) | ClientError::Server { .. } | ClientError::Parse(_)
        )
    }

    /// Whether the server refused the credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Server { status: 401 | 403, .. })
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Network(err.to_string())
    }
}

/// Result type alias for the client.
pub type Result<T> = std::result::Result<T, ClientError>;
