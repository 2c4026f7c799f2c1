//! User model.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::AuthError;

/// Shared handle to a resolved identity.
pub type UserRef = Arc<dyn UserInterface>;

/// Capabilities the pipeline needs from a user object.
pub trait UserInterface: fmt::Debug + Send + Sync + 'static {
    /// Unique username.
    fn username(&self) -> &str;

    /// Granted roles.
    fn roles(&self) -> &[String];

    /// Stored password hash, if the user has one.
    fn password(&self) -> Option<&str>;

    /// Stable class name recorded in remember-me cookies and tokens.
    ///
    /// Must not contain `:`.
    fn class_name(&self) -> &str;

    /// Identity-equality capability.
    ///
    /// `None` means the type has no opinion and the token falls back to
    /// comparing password, roles and username.
    fn is_equal_to(&self, _other: &dyn UserInterface) -> Option<bool> {
        None
    }

    /// Account status flags, for types that track them.
    fn account_status(&self) -> Option<AccountStatus> {
        None
    }

    /// Copy of this user with sensitive data removed.
    fn without_credentials(&self) -> Option<UserRef> {
        None
    }

    /// Upcast used for concrete-type comparisons.
    fn as_any(&self) -> &dyn Any;
}

/// Account status flags checked by the [`UserChecker`](crate::UserChecker).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountStatus {
    /// The account may log in.
    pub enabled: bool,
    /// The account has not expired.
    pub account_non_expired: bool,
    /// The credentials have not expired.
    pub credentials_non_expired: bool,
    /// The account is not locked.
    pub account_non_locked: bool,
}

impl Default for AccountStatus {
    fn default() -> Self {
        Self {
            enabled: true,
            account_non_expired: true,
            credentials_non_expired: true,
            account_non_locked: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Default user implementation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    username: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default = "default_true")]
    account_non_expired: bool,
    #[serde(default = "default_true")]
    credentials_non_expired: bool,
    #[serde(default = "default_true")]
    account_non_locked: bool,
    #[serde(default)]
    extra_fields: HashMap<String, Value>,
}

impl User {
    /// Creates an enabled user without roles.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidArgument`] if the username is empty.
    pub fn new(username: impl Into<String>, password: Option<String>) -> Result<Self, AuthError> {
        let username = username.into();
        if username.is_empty() {
            return Err(AuthError::InvalidArgument(
                "The username cannot be empty.".into(),
            ));
        }

        Ok(Self {
            username,
            email: None,
            password,
            roles: Vec::new(),
            enabled: true,
            account_non_expired: true,
            credentials_non_expired: true,
            account_non_locked: true,
            extra_fields: HashMap::new(),
        })
    }

    /// Sets the email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the roles.
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Enables or disables the account.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Marks the account as expired or not.
    pub fn with_account_non_expired(mut self, value: bool) -> Self {
        self.account_non_expired = value;
        self
    }

    /// Marks the credentials as expired or not.
    pub fn with_credentials_non_expired(mut self, value: bool) -> Self {
        self.credentials_non_expired = value;
        self
    }

    /// Locks or unlocks the account.
    pub fn with_account_non_locked(mut self, value: bool) -> Self {
        self.account_non_locked = value;
        self
    }

    /// Adds an application-specific field.
    pub fn with_extra_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra_fields.insert(key.into(), value);
        self
    }

    /// Email address.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Application-specific field.
    pub fn extra_field(&self, key: &str) -> Option<&Value> {
        self.extra_fields.get(key)
    }

    /// Wraps the user in a shared handle.
    pub fn into_ref(self) -> UserRef {
        Arc::new(self)
    }
}

impl UserInterface for User {
    fn username(&self) -> &str {
        &self.username
    }

    fn roles(&self) -> &[String] {
        &self.roles
    }

    fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    fn class_name(&self) -> &str {
        "User"
    }

    fn is_equal_to(&self, other: &dyn UserInterface) -> Option<bool> {
        Some(
            other
                .as_any()
                .downcast_ref::<User>()
                .is_some_and(|other| self == other),
        )
    }

    fn account_status(&self) -> Option<AccountStatus> {
        Some(AccountStatus {
            enabled: self.enabled,
            account_non_expired: self.account_non_expired,
            credentials_non_expired: self.credentials_non_expired,
            account_non_locked: self.account_non_locked,
        })
    }

    fn without_credentials(&self) -> Option<UserRef> {
        let mut user = self.clone();
        user.password = None;
        Some(Arc::new(user))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_defaults() {
        let user = User::new("alice", Some("hash".into())).unwrap();
        assert_eq!(user.username(), "alice");
        assert_eq!(user.password(), Some("hash"));
        assert!(user.roles().is_empty());
        assert_eq!(user.account_status(), Some(AccountStatus::default()));
    }

    #[test]
    fn test_empty_username_rejected() {
        assert!(matches!(
            User::new("", None),
            Err(AuthError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_is_equal_to_compares_all_fields() {
        let a = User::new("alice", Some("h1".into()))
            .unwrap()
            .with_roles(["ROLE_USER"]);
        let b = a.clone();
        let locked = a.clone().with_account_non_locked(false);

        assert_eq!(a.is_equal_to(&b), Some(true));
        assert_eq!(a.is_equal_to(&locked), Some(false));
    }

    #[test]
    fn test_without_credentials_drops_password() {
        let user = User::new("alice", Some("hash".into())).unwrap();
        let stripped = user.without_credentials().unwrap();
        assert_eq!(stripped.password(), None);
        assert_eq!(stripped.username(), "alice");
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let user: User = serde_json::from_value(serde_json::json!({
            "username": "bob",
            "roles": ["ROLE_ADMIN"],
            "enabled": false
        }))
        .unwrap();

        assert_eq!(user.roles(), ["ROLE_ADMIN".to_string()]);
        let status = user.account_status().unwrap();
        assert!(!status.enabled);
        assert!(status.account_non_locked);
    }
}
