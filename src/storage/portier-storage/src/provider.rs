//! Token provider trait definition.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::token::PersistentToken;

/// Storage for remember-me persistent tokens, keyed by series.
///
/// This is the one resource shared between concurrent requests, so
/// [`update_token`](TokenProvider::update_token) must replace the value of a
/// series atomically.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Loads the record for a series.
    ///
    /// Returns [`StorageError::NotFound`] if the series is unknown.
    async fn load_token_by_series(&self, series: &str) -> Result<PersistentToken, StorageError>;

    /// Deletes the record for a series.
    ///
    /// Returns [`StorageError::NotFound`] if the series is unknown.
    async fn delete_token_by_series(&self, series: &str) -> Result<(), StorageError>;

    /// Replaces the token value and last-used time of a series.
    ///
    /// Returns [`StorageError::NotFound`] if the series is unknown.
    async fn update_token(
        &self,
        series: &str,
        token_value: &str,
        last_used: u64,
    ) -> Result<(), StorageError>;

    /// Persists a new lineage.
    ///
    /// Returns [`StorageError::AlreadyExists`] if the series is taken.
    async fn create_new_token(&self, token: PersistentToken) -> Result<(), StorageError>;

    /// Deletes every lineage of a user and returns how many were removed.
    async fn delete_tokens_by_username(&self, username: &str) -> Result<u64, StorageError>;

    /// Returns the name of this provider for logging/debugging.
    fn name(&self) -> &'static str;
}
