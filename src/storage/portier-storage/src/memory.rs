//! In-memory token provider.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::StorageError;
use crate::provider::TokenProvider;
use crate::token::PersistentToken;

/// Token provider keeping every lineage in process memory.
///
/// Tokens do not survive a restart. Suited to tests and single-instance
/// deployments.
#[derive(Debug, Default)]
pub struct InMemoryTokenProvider {
    tokens: RwLock<HashMap<String, PersistentToken>>,
}

impl InMemoryTokenProvider {
    /// Creates an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored lineages.
    pub fn len(&self) -> usize {
        self.tokens.read().len()
    }

    /// Returns true when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.tokens.read().is_empty()
    }
}

#[async_trait]
impl TokenProvider for InMemoryTokenProvider {
    async fn load_token_by_series(&self, series: &str) -> Result<PersistentToken, StorageError> {
        self.tokens
            .read()
            .get(series)
            .cloned()
            .ok_or_else(|| StorageError::NotFound("No token found.".into()))
    }

    async fn delete_token_by_series(&self, series: &str) -> Result<(), StorageError> {
        match self.tokens.write().remove(series) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound("No token found.".into())),
        }
    }

    async fn update_token(
        &self,
        series: &str,
        token_value: &str,
        last_used: u64,
    ) -> Result<(), StorageError> {
        let mut tokens = self.tokens.write();
        let current = tokens
            .get(series)
            .ok_or_else(|| StorageError::NotFound("No token found.".into()))?;

        let updated = PersistentToken::new(
            current.class(),
            current.username(),
            series,
            token_value,
            last_used,
        )?;
        tokens.insert(series.to_string(), updated);

        debug!(provider = "memory", "Token rotated");

        Ok(())
    }

    async fn create_new_token(&self, token: PersistentToken) -> Result<(), StorageError> {
        let mut tokens = self.tokens.write();
        if tokens.contains_key(token.series()) {
            return Err(StorageError::AlreadyExists("series already in use".into()));
        }
        tokens.insert(token.series().to_string(), token);
        Ok(())
    }

    async fn delete_tokens_by_username(&self, username: &str) -> Result<u64, StorageError> {
        let mut tokens = self.tokens.write();
        let before = tokens.len();
        tokens.retain(|_, token| token.username() != username);
        Ok((before - tokens.len()) as u64)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    fn token(series: &str, username: &str) -> PersistentToken {
        PersistentToken::new("User", username, series, "value", 100).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_load() {
        let provider = InMemoryTokenProvider::new();
        provider.create_new_token(token("s1", "alice")).await.unwrap();

        let loaded = provider.load_token_by_series("s1").await.unwrap();
        assert_eq!(loaded.username(), "alice");
        assert_eq!(provider.len(), 1);
    }

    #[tokio::test]
    async fn test_load_missing() {
        let provider = InMemoryTokenProvider::new();
        let result = provider.load_token_by_series("nope").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_replaces_value() {
        let provider = InMemoryTokenProvider::new();
        provider.create_new_token(token("s1", "alice")).await.unwrap();

        provider.update_token("s1", "rotated", 200).await.unwrap();

        let loaded = provider.load_token_by_series("s1").await.unwrap();
        assert_eq!(loaded.token_value(), "rotated");
        assert_eq!(loaded.last_used(), 200);
        assert_eq!(loaded.class(), "User");
        assert_eq!(provider.len(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_series() {
        let provider = InMemoryTokenProvider::new();
        let result = provider.update_token("nope", "v", 1).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete() {
        let provider = InMemoryTokenProvider::new();
        provider.create_new_token(token("s1", "alice")).await.unwrap();

        provider.delete_token_by_series("s1").await.unwrap();
        assert!(provider.is_empty());

        let result = provider.delete_token_by_series("s1").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_duplicate_series_rejected() {
        let provider = InMemoryTokenProvider::new();
        provider.create_new_token(token("s1", "alice")).await.unwrap();

        let result = provider.create_new_token(token("s1", "bob")).await;
        assert!(matches!(result, Err(StorageError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_delete_by_username() {
        let provider = InMemoryTokenProvider::new();
        provider.create_new_token(token("s1", "alice")).await.unwrap();
        provider.create_new_token(token("s2", "alice")).await.unwrap();
        provider.create_new_token(token("s3", "bob")).await.unwrap();

        let removed = provider.delete_tokens_by_username("alice").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(provider.len(), 1);
    }
}
