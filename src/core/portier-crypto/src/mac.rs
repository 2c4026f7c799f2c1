//! HMAC-SHA256 signing and constant-time comparison.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::CryptoError;
use crate::keys::SecretKey;

type HmacSha256 = Hmac<Sha256>;

/// Computes HMAC-SHA256 of `data` under `key`.
///
/// # Errors
///
/// Returns an error if the key is rejected by the MAC implementation.
pub fn sign(key: &SecretKey, data: &[u8]) -> Result<[u8; 32], CryptoError> {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}

/// Computes HMAC-SHA256 of `data` under `key`, as lowercase hex.
pub fn sign_hex(key: &SecretKey, data: &[u8]) -> Result<String, CryptoError> {
    Ok(hex::encode(sign(key, data)?))
}

/// Compares two byte strings without short-circuiting on the first mismatch.
///
/// Length differences are not hidden.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    // RFC 4231 test case 2.
    #[test]
    fn test_sign_known_vector() {
        let key = SecretKey::from_bytes(b"Jefe").unwrap();
        let mac = sign_hex(&key, b"what do ya want for nothing?").unwrap();
        assert_eq!(
            mac,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_sign_depends_on_key() {
        let a = SecretKey::from_bytes(b"key-a").unwrap();
        let b = SecretKey::from_bytes(b"key-b").unwrap();
        assert_ne!(sign(&a, b"data").unwrap(), sign(&b, b"data").unwrap());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"", b""));
    }
}
