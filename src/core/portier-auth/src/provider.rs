//! Identity loaders.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::user::{User, UserInterface, UserRef};
use crate::AuthError;

/// Which lookup a [`UserBadge`](crate::passport::UserBadge) performs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMethod {
    /// Username first, then email.
    #[default]
    Any,
    /// Username only.
    Username,
    /// Email only.
    Email,
}

/// Loads users by identifier.
///
/// Implementations return [`AuthError::UserNotFound`] when no user matches.
#[async_trait]
pub trait UserProvider: Send + Sync {
    /// Loads a user by username.
    async fn load_by_username(&self, username: &str) -> Result<UserRef, AuthError>;

    /// Loads a user by email address.
    async fn load_by_email(&self, email: &str) -> Result<UserRef, AuthError>;

    /// Loads a user by username or email.
    async fn load(&self, identifier: &str) -> Result<UserRef, AuthError> {
        match self.load_by_username(identifier).await {
            Err(AuthError::UserNotFound { .. }) => self.load_by_email(identifier).await,
            other => other,
        }
    }

    /// Reloads a user to pick up changes made since it was loaded.
    async fn refresh(&self, user: &UserRef) -> Result<UserRef, AuthError> {
        self.load_by_username(user.username()).await
    }

    /// Dispatches to the lookup named by `method`.
    async fn load_with(&self, method: LoadMethod, identifier: &str) -> Result<UserRef, AuthError> {
        match method {
            LoadMethod::Any => self.load(identifier).await,
            LoadMethod::Username => self.load_by_username(identifier).await,
            LoadMethod::Email => self.load_by_email(identifier).await,
        }
    }
}

/// User provider backed by a map held in memory.
#[derive(Debug, Default)]
pub struct InMemoryUserProvider {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserProvider {
    /// Creates an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider holding the given users.
    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let provider = Self::new();
        for user in users {
            provider.insert(user);
        }
        provider
    }

    /// Adds or replaces a user.
    pub fn insert(&self, user: User) {
        self.users.write().insert(user.username().to_string(), user);
    }

    /// Removes a user.
    pub fn remove(&self, username: &str) -> Option<User> {
        self.users.write().remove(username)
    }
}

#[async_trait]
impl UserProvider for InMemoryUserProvider {
    async fn load_by_username(&self, username: &str) -> Result<UserRef, AuthError> {
        debug!(username = %username, "Loading user by username");

        self.users
            .read()
            .get(username)
            .cloned()
            .map(User::into_ref)
            .ok_or_else(|| AuthError::UserNotFound {
                identifier: username.to_string(),
            })
    }

    async fn load_by_email(&self, email: &str) -> Result<UserRef, AuthError> {
        self.users
            .read()
            .values()
            .find(|user| user.email() == Some(email))
            .cloned()
            .map(User::into_ref)
            .ok_or_else(|| AuthError::UserNotFound {
                identifier: email.to_string(),
            })
    }
}
