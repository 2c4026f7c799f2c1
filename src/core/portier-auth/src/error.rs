//! Authentication error types.

use portier_crypto::CryptoError;
use portier_storage::StorageError;
use thiserror::Error;

use crate::user::UserRef;

/// Errors that can occur during authentication.
///
/// The first group of variants are authentication failures: the manager
/// turns them into the failure path of the authenticator that raised them.
/// Every other variant propagates to the caller.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Authentication failed without a more specific reason (e.g. expired cookie).
    #[error("{0}")]
    Authentication(String),

    /// Presented credentials are wrong, or a passport still holds unresolved badges.
    #[error("{0}")]
    BadCredentials(String),

    /// The CSRF token sent with the login request is invalid.
    #[error("Invalid CSRF token.")]
    InvalidCsrfToken,

    /// The identity loader could not resolve the identifier.
    #[error("user \"{identifier}\" not found")]
    UserNotFound {
        /// The identifier that was looked up.
        identifier: String,
    },

    /// The account is disabled.
    #[error("Account is disabled.")]
    Disabled {
        /// The offending user.
        user: UserRef,
    },

    /// The account is locked.
    #[error("Account is locked.")]
    Locked {
        /// The offending user.
        user: UserRef,
    },

    /// The account has expired.
    #[error("Account has expired.")]
    AccountExpired {
        /// The offending user.
        user: UserRef,
    },

    /// The account credentials have expired.
    #[error("Credentials have expired.")]
    CredentialsExpired {
        /// The offending user.
        user: UserRef,
    },

    /// A remember-me cookie carried a valid series with the wrong token value.
    #[error("{0}")]
    CookieTheft(String),

    /// No persistent remember-me token exists for the presented series.
    #[error("{0}")]
    TokenNotFound(String),

    /// Programming error, such as reading credentials that were already erased.
    #[error("{0}")]
    Logic(String),

    /// Invalid argument or configuration value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The request does not carry credentials in the expected shape.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Cryptographic error.
    #[error("crypto error: {0}")]
    Crypto(String),
}

impl AuthError {
    /// Returns true for errors that belong to the authentication failure taxonomy.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            Self::Authentication(_)
                | Self::BadCredentials(_)
                | Self::InvalidCsrfToken
                | Self::UserNotFound { .. }
                | Self::Disabled { .. }
                | Self::Locked { .. }
                | Self::AccountExpired { .. }
                | Self::CredentialsExpired { .. }
                | Self::CookieTheft(_)
                | Self::TokenNotFound(_)
        )
    }

    /// Returns true for the account status family.
    pub fn is_account_status(&self) -> bool {
        matches!(
            self,
            Self::Disabled { .. }
                | Self::Locked { .. }
                | Self::AccountExpired { .. }
                | Self::CredentialsExpired { .. }
        )
    }

    /// Message safe to show to end users.
    ///
    /// Unknown users and wrong passwords share one message.
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::BadCredentials(_) | Self::UserNotFound { .. } => "Invalid credentials.",
            Self::InvalidCsrfToken => "Invalid CSRF token.",
            Self::Disabled { .. } => "Account is disabled.",
            Self::Locked { .. } => "Account is locked.",
            Self::AccountExpired { .. } => "Account has expired.",
            Self::CredentialsExpired { .. } => "Credentials have expired.",
            Self::CookieTheft(_) => "Cookie has already been used by someone else.",
            Self::TokenNotFound(_) => "No token could be found.",
            _ => "An authentication exception occurred.",
        }
    }

    /// The user attached to an account status error.
    pub fn user(&self) -> Option<&UserRef> {
        match self {
            Self::Disabled { user }
            | Self::Locked { user }
            | Self::AccountExpired { user }
            | Self::CredentialsExpired { user } => Some(user),
            _ => None,
        }
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(msg) => Self::TokenNotFound(msg),
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<CryptoError> for AuthError {
    fn from(err: CryptoError) -> Self {
        Self::Crypto(err.to_string())
    }
}
