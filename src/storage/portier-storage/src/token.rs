//! Persistent remember-me token record.

use crate::error::StorageError;

/// One remember-me lineage as persisted by a [`TokenProvider`](crate::TokenProvider).
///
/// The record is immutable: rotation replaces `token_value` and `last_used`
/// through the provider, never by mutating an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistentToken {
    class: String,
    username: String,
    series: String,
    token_value: String,
    last_used: u64,
}

impl PersistentToken {
    /// Creates a new record.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidInput`] if any string field is empty.
    pub fn new(
        class: impl Into<String>,
        username: impl Into<String>,
        series: impl Into<String>,
        token_value: impl Into<String>,
        last_used: u64,
    ) -> Result<Self, StorageError> {
        let token = Self {
            class: class.into(),
            username: username.into(),
            series: series.into(),
            token_value: token_value.into(),
            last_used,
        };

        for (field, value) in [
            ("class", &token.class),
            ("username", &token.username),
            ("series", &token.series),
            ("token value", &token.token_value),
        ] {
            if value.is_empty() {
                return Err(StorageError::InvalidInput(format!("{field} must not be empty")));
            }
        }

        Ok(token)
    }

    /// User class the token was issued for.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Username the token was issued for.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Stable lineage identifier.
    pub fn series(&self) -> &str {
        &self.series
    }

    /// Stored token value (usually a keyed hash of the cookie value).
    pub fn token_value(&self) -> &str {
        &self.token_value
    }

    /// Unix timestamp of the last successful use.
    pub fn last_used(&self) -> u64 {
        self.last_used
    }
}
