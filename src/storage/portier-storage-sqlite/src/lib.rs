//! # Portier Storage - SQLite Backend
//!
//! SQLite implementation of the remember-me [`TokenProvider`].
//! Each lineage is one row of `remember_me_token`, keyed by series.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use portier_storage::{PersistentToken, StorageError, TokenProvider};

/// SQLite token provider.
///
/// The database lives at `{base_path}/{name}.db`.
#[derive(Clone)]
pub struct SqliteTokenProvider {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl SqliteTokenProvider {
    /// Opens or creates a token database.
    ///
    /// # Arguments
    ///
    /// * `base_path` - Directory where the database file is stored
    /// * `name` - Database name (must match `[a-z0-9_-]+`)
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The name is invalid
    /// - Directory cannot be created
    /// - Database connection fails
    pub async fn open(base_path: impl AsRef<Path>, name: &str) -> Result<Self, StorageError> {
        Self::validate_name(name)?;

        let base = base_path.as_ref();
        std::fs::create_dir_all(base).map_err(|e| {
            StorageError::ConnectionFailed(format!("failed to create directory: {e}"))
        })?;

        let db_path = base.join(format!("{name}.db"));
        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        debug!(name = %name, path = %db_path.display(), "Opening SQLite token database");

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        let provider = Self { pool, db_path };

        provider.migrate().await?;

        info!(name = %name, "SQLite token provider ready");

        Ok(provider)
    }

    /// Path of the underlying database file.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Validates that a database name is safe to use as a file name.
    ///
    /// Only allows: lowercase letters, digits, underscore, hyphen.
    fn validate_name(name: &str) -> Result<(), StorageError> {
        if name.is_empty() {
            return Err(StorageError::InvalidInput("name cannot be empty".into()));
        }

        if name.len() > 64 {
            return Err(StorageError::InvalidInput("name too long".into()));
        }

        let valid = name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');

        if !valid {
            return Err(StorageError::InvalidInput(
                "name must match [a-z0-9_-]+".into(),
            ));
        }

        Ok(())
    }

    /// Runs database migrations.
    async fn migrate(&self) -> Result<(), StorageError> {
        debug!("Running database migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS remember_me_token (
                series    TEXT PRIMARY KEY,
                class     TEXT NOT NULL,
                username  TEXT NOT NULL,
                value     TEXT NOT NULL,
                last_used INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::ConnectionFailed(format!("migration failed: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_remember_me_username ON remember_me_token (username)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::ConnectionFailed(format!("migration failed: {e}")))?;

        debug!("Migrations complete");

        Ok(())
    }
}

#[async_trait]
impl TokenProvider for SqliteTokenProvider {
    async fn load_token_by_series(&self, series: &str) -> Result<PersistentToken, StorageError> {
        let row: Option<(String, String, String, i64)> = sqlx::query_as(
            "SELECT class, username, value, last_used FROM remember_me_token WHERE series = ?",
        )
        .bind(series)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        let (class, username, value, last_used) =
            row.ok_or_else(|| StorageError::NotFound("No token found.".into()))?;

        PersistentToken::new(class, username, series, value, last_used.max(0) as u64)
    }

    async fn delete_token_by_series(&self, series: &str) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM remember_me_token WHERE series = ?")
            .bind(series)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        if result.rows_affected() < 1 {
            return Err(StorageError::NotFound("No token found.".into()));
        }

        Ok(())
    }

    async fn update_token(
        &self,
        series: &str,
        token_value: &str,
        last_used: u64,
    ) -> Result<(), StorageError> {
        let result = sqlx::query(
            "UPDATE remember_me_token SET value = ?, last_used = ? WHERE series = ?",
        )
        .bind(token_value)
        .bind(last_used as i64)
        .bind(series)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        if result.rows_affected() < 1 {
            return Err(StorageError::NotFound("No token found.".into()));
        }

        Ok(())
    }

    async fn create_new_token(&self, token: PersistentToken) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO remember_me_token (class, username, series, value, last_used) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(token.class())
        .bind(token.username())
        .bind(token.series())
        .bind(token.token_value())
        .bind(token.last_used() as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_unique_violation() => {
                StorageError::AlreadyExists("series already in use".into())
            }
            _ => StorageError::QueryFailed(e.to_string()),
        })?;

        Ok(())
    }

    async fn delete_tokens_by_username(&self, username: &str) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM remember_me_token WHERE username = ?")
            .bind(username)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        Ok(result.rows_affected())
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, SqliteTokenProvider) {
        let tmp = TempDir::new().unwrap();
        let provider = SqliteTokenProvider::open(tmp.path(), "remember-me")
            .await
            .unwrap();
        (tmp, provider)
    }

    fn token(series: &str, username: &str, value: &str) -> PersistentToken {
        PersistentToken::new("User", username, series, value, 1_700_000_000).unwrap()
    }

    #[tokio::test]
    async fn test_open_creates_db() {
        let tmp = TempDir::new().unwrap();
        let provider = SqliteTokenProvider::open(tmp.path(), "tokens").await.unwrap();

        let db_path = tmp.path().join("tokens.db");
        assert!(db_path.exists(), "database file should be created");
        assert_eq!(provider.db_path(), db_path.as_path());
    }

    #[tokio::test]
    async fn test_name_validation() {
        let tmp = TempDir::new().unwrap();

        for name in ["", "Tokens", "my tokens", "a/b", "../escape", "tokens.db"] {
            let result = SqliteTokenProvider::open(tmp.path(), name).await;
            assert!(
                matches!(result, Err(StorageError::InvalidInput(_))),
                "should reject name: {name:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_create_load_roundtrip() {
        let (_tmp, provider) = setup().await;

        provider
            .create_new_token(token("series-1", "alice", "sha256_abc"))
            .await
            .unwrap();

        let loaded = provider.load_token_by_series("series-1").await.unwrap();
        assert_eq!(loaded.class(), "User");
        assert_eq!(loaded.username(), "alice");
        assert_eq!(loaded.token_value(), "sha256_abc");
        assert_eq!(loaded.last_used(), 1_700_000_000);
    }

    #[tokio::test]
    async fn test_load_missing() {
        let (_tmp, provider) = setup().await;
        let result = provider.load_token_by_series("missing").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_token() {
        let (_tmp, provider) = setup().await;
        provider
            .create_new_token(token("series-1", "alice", "v1"))
            .await
            .unwrap();

        provider
            .update_token("series-1", "v2", 1_700_000_100)
            .await
            .unwrap();

        let loaded = provider.load_token_by_series("series-1").await.unwrap();
        assert_eq!(loaded.token_value(), "v2");
        assert_eq!(loaded.last_used(), 1_700_000_100);

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM remember_me_token")
            .fetch_one(&provider.pool)
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }

    #[tokio::test]
    async fn test_update_missing_series() {
        let (_tmp, provider) = setup().await;
        let result = provider.update_token("missing", "v", 1).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_token() {
        let (_tmp, provider) = setup().await;
        provider
            .create_new_token(token("series-1", "alice", "v1"))
            .await
            .unwrap();

        provider.delete_token_by_series("series-1").await.unwrap();

        let result = provider.load_token_by_series("series-1").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));

        let result = provider.delete_token_by_series("series-1").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_duplicate_series() {
        let (_tmp, provider) = setup().await;
        provider
            .create_new_token(token("series-1", "alice", "v1"))
            .await
            .unwrap();

        let result = provider
            .create_new_token(token("series-1", "bob", "v2"))
            .await;
        assert!(matches!(result, Err(StorageError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_delete_by_username() {
        let (_tmp, provider) = setup().await;
        for (series, user) in [("s1", "alice"), ("s2", "alice"), ("s3", "bob")] {
            provider
                .create_new_token(token(series, user, "v"))
                .await
                .unwrap();
        }

        assert_eq!(provider.delete_tokens_by_username("alice").await.unwrap(), 2);
        assert_eq!(provider.delete_tokens_by_username("alice").await.unwrap(), 0);
        assert!(provider.load_token_by_series("s3").await.is_ok());
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        {
            let provider = SqliteTokenProvider::open(tmp.path(), "tokens").await.unwrap();
            provider
                .create_new_token(token("series-1", "alice", "v1"))
                .await
                .unwrap();
        }

        let provider = SqliteTokenProvider::open(tmp.path(), "tokens").await.unwrap();
        let loaded = provider.load_token_by_series("series-1").await.unwrap();
        assert_eq!(loaded.username(), "alice");
    }
}
