//! Error types for the Payvault authentication core
//!
//! Wrong passwords, locked accounts, stale reset tokens and missing sessions
//! are not errors here. Those paths answer with `false` so login handling
//! never needs error-driven control flow.

use thiserror::Error;

/// Result type alias for authentication operations
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur at the boundaries of the authentication core
#[derive(Debug, Error)]
pub enum AuthError {
    /// Empty plaintext, badly encoded salt, or a credential bound to the wrong principal
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Key derivation rejected its parameters
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Credential store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration could not be parsed or is inconsistent
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for AuthError {
    fn from(e: serde_json::Error) -> Self {
        AuthError::Storage(e.to_string())
    }
}

impl From<toml::de::Error> for AuthError {
    fn from(e: toml::de::Error) -> Self {
        AuthError::Config(e.to_string())
    }
}
