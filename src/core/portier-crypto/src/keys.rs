//! Secret key material with automatic memory zeroization.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;
use crate::random::generate_bytes;

/// Size of a generated secret, in bytes.
pub const SECRET_SIZE: usize = 32;

/// A server-side secret used to sign remember-me cookies and hash token values.
///
/// The secret is securely erased from memory when dropped and never
/// printed by its `Debug` implementation.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    bytes: Vec<u8>,
}

impl SecretKey {
    /// Generates a new random secret.
    pub fn generate() -> Self {
        let bytes = generate_bytes(SECRET_SIZE);
        Self {
            bytes: bytes.to_vec(),
        }
    }

    /// Creates a secret from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.is_empty() {
            return Err(CryptoError::InvalidKey("secret cannot be empty".into()));
        }

        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    /// Returns the raw secret bytes.
    ///
    /// Use with caution - the returned slice is not zeroized automatically.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}
