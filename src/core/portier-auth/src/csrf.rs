//! CSRF token management for login forms.

use std::collections::HashMap;

use parking_lot::RwLock;
use portier_crypto::mac::constant_time_eq;
use portier_crypto::random::generate_hex_token;

/// Issues and validates CSRF tokens by identifier.
pub trait CsrfTokenManager: Send + Sync {
    /// Returns the token for `id`, creating it if needed.
    fn get_token(&self, id: &str) -> String;

    /// Whether `value` is the current token for `id`.
    fn is_token_valid(&self, id: &str, value: &str) -> bool;

    /// Forgets every token.
    fn clear(&self);
}

/// CSRF tokens held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryCsrfTokenManager {
    tokens: RwLock<HashMap<String, String>>,
}

impl InMemoryCsrfTokenManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CsrfTokenManager for InMemoryCsrfTokenManager {
    fn get_token(&self, id: &str) -> String {
        if let Some(token) = self.tokens.read().get(id) {
            return token.clone();
        }

        self.tokens
            .write()
            .entry(id.to_string())
            .or_insert_with(|| generate_hex_token(32))
            .clone()
    }

    fn is_token_valid(&self, id: &str, value: &str) -> bool {
        match self.tokens.read().get(id) {
            Some(token) => constant_time_eq(token.as_bytes(), value.as_bytes()),
            None => false,
        }
    }

    fn clear(&self) {
        self.tokens.write().clear();
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_stable_per_id() {
        let manager = InMemoryCsrfTokenManager::new();
        let a = manager.get_token("authenticate");
        assert_eq!(a, manager.get_token("authenticate"));
        assert_ne!(a, manager.get_token("logout"));
    }

    #[test]
    fn test_validation() {
        let manager = InMemoryCsrfTokenManager::new();
        assert!(!manager.is_token_valid("authenticate", "anything"));

        let token = manager.get_token("authenticate");
        assert!(manager.is_token_valid("authenticate", &token));
        assert!(!manager.is_token_valid("authenticate", "forged"));

        manager.clear();
        assert!(!manager.is_token_valid("authenticate", &token));
    }
}
