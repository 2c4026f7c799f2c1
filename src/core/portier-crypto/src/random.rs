//! Cryptographically secure random generation.
//!
//! Uses the operating system's CSPRNG for all random number generation.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroizing;

/// Number of random bytes behind a remember-me series or token value.
pub const TOKEN_BYTES: usize = 64;

/// Generates cryptographically secure random bytes.
///
/// # Arguments
///
/// * `len` - Number of random bytes to generate
pub fn generate_bytes(len: usize) -> Zeroizing<Vec<u8>> {
    let mut bytes = Zeroizing::new(vec![0u8; len]);
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Generates a cryptographically secure random token, base64 encoded.
///
/// # Arguments
///
/// * `byte_len` - Number of random bytes before encoding
pub fn generate_token(byte_len: usize) -> String {
    STANDARD.encode(generate_bytes(byte_len).as_slice())
}

/// Generates a cryptographically secure random token as a hex string.
///
/// # Arguments
///
/// * `byte_len` - Number of random bytes (output string will be 2x this length)
pub fn generate_hex_token(byte_len: usize) -> String {
    hex::encode(generate_bytes(byte_len).as_slice())
}
