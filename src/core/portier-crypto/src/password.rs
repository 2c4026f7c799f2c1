//! Password encoding and verification.
//!
//! Stored hashes use the PHC string format produced by Argon2id.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;

use crate::error::CryptoError;

/// Longest raw password accepted by an encoder.
pub const MAX_PASSWORD_LENGTH: usize = 4096;

/// Hashes and verifies user passwords.
pub trait PasswordEncoder: Send + Sync {
    /// Hashes a raw password.
    ///
    /// # Errors
    ///
    /// Returns an error if the password is too long or hashing fails.
    fn encode(&self, raw: &str) -> Result<String, CryptoError>;

    /// Checks a raw password against a stored hash.
    fn is_valid(&self, encoded: &str, raw: &str) -> bool;

    /// Returns true when the stored hash was produced with other parameters
    /// than the ones this encoder is configured with.
    fn needs_rehash(&self, encoded: &str) -> bool;
}

/// Argon2id password encoder.
#[derive(Debug, Clone)]
pub struct Argon2PasswordEncoder {
    params: Params,
}

impl Argon2PasswordEncoder {
    /// Creates an encoder with explicit cost parameters.
    ///
    /// # Arguments
    ///
    /// * `m_cost` - Memory size in KiB
    /// * `t_cost` - Number of iterations
    /// * `p_cost` - Degree of parallelism
    pub fn with_cost(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, CryptoError> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| CryptoError::InvalidParameters(e.to_string()))?;
        Ok(Self { params })
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for Argon2PasswordEncoder {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl PasswordEncoder for Argon2PasswordEncoder {
    fn encode(&self, raw: &str) -> Result<String, CryptoError> {
        if raw.len() > MAX_PASSWORD_LENGTH {
            return Err(CryptoError::InvalidInput("Invalid password.".into()));
        }

        let salt = SaltString::generate(&mut OsRng);
        self.hasher()
            .hash_password(raw.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| CryptoError::HashingFailed(e.to_string()))
    }

    fn is_valid(&self, encoded: &str, raw: &str) -> bool {
        if encoded.is_empty() || raw.is_empty() || raw.len() > MAX_PASSWORD_LENGTH {
            return false;
        }

        let Ok(parsed) = PasswordHash::new(encoded) else {
            return false;
        };

        self.hasher()
            .verify_password(raw.as_bytes(), &parsed)
            .is_ok()
    }

    fn needs_rehash(&self, encoded: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(encoded) else {
            return true;
        };

        if parsed.algorithm != Algorithm::Argon2id.ident() {
            return true;
        }

        match Params::try_from(&parsed) {
            Ok(params) => {
                params.m_cost() != self.params.m_cost()
                    || params.t_cost() != self.params.t_cost()
                    || params.p_cost() != self.params.p_cost()
            }
            Err(_) => true,
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    fn cheap() -> Argon2PasswordEncoder {
        Argon2PasswordEncoder::with_cost(8, 1, 1).unwrap()
    }

    #[test]
    fn test_encode_and_verify() {
        let encoder = cheap();
        let hash = encoder.encode("correct horse").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(encoder.is_valid(&hash, "correct horse"));
        assert!(!encoder.is_valid(&hash, "battery staple"));
    }

    #[test]
    fn test_same_password_different_salts() {
        let encoder = cheap();
        let a = encoder.encode("secret").unwrap();
        let b = encoder.encode("secret").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_too_long_password_rejected() {
        let encoder = cheap();
        let long = "a".repeat(MAX_PASSWORD_LENGTH + 1);

        assert!(matches!(
            encoder.encode(&long),
            Err(CryptoError::InvalidInput(_))
        ));

        let hash = encoder.encode("short").unwrap();
        assert!(!encoder.is_valid(&hash, &long));
    }

    #[test]
    fn test_empty_inputs_never_valid() {
        let encoder = cheap();
        let hash = encoder.encode("secret").unwrap();

        assert!(!encoder.is_valid(&hash, ""));
        assert!(!encoder.is_valid("", "secret"));
        assert!(!encoder.is_valid("not-a-phc-string", "secret"));
    }

    #[test]
    fn test_needs_rehash() {
        let encoder = cheap();
        let hash = encoder.encode("secret").unwrap();
        assert!(!encoder.needs_rehash(&hash));

        let stronger = Argon2PasswordEncoder::with_cost(16, 2, 1).unwrap();
        assert!(stronger.needs_rehash(&hash));

        assert!(encoder.needs_rehash("garbage"));
    }

    #[test]
    fn test_invalid_parameters() {
        let result = Argon2PasswordEncoder::with_cost(1, 0, 1);
        assert!(matches!(result, Err(CryptoError::InvalidParameters(_))));
    }
}
