//! # Portier Crypto
//!
//! Cryptographic primitives used by the Portier authentication pipeline.
//!
//! This crate provides:
//! - Secure random generation for remember-me series and token values
//! - HMAC-SHA256 signing and constant-time comparison
//! - Secret key material with automatic zeroization
//! - Password encoding and verification (Argon2id)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod keys;
pub mod mac;
pub mod password;
pub mod random;

pub use error::CryptoError;
pub use keys::SecretKey;
pub use password::{Argon2PasswordEncoder, PasswordEncoder, MAX_PASSWORD_LENGTH};
