//! Cryptographic error types.

use thiserror::Error;

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Invalid key format or size.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Invalid input data.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Password hashing failed.
    #[error("hashing failed: {0}")]
    HashingFailed(String),

    /// Invalid hashing parameters.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
}
