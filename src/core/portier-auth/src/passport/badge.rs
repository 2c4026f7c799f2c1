//! Badges: individual facts a passport must resolve before login succeeds.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use zeroize::Zeroizing;

use crate::provider::{LoadMethod, UserProvider};
use crate::user::{UserInterface, UserRef};
use crate::AuthError;

/// Discriminator of the closed set of badge types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BadgeKind {
    /// [`UserBadge`].
    User,
    /// [`PasswordCredentials`].
    PasswordCredentials,
    /// [`CsrfTokenBadge`].
    CsrfToken,
    /// [`CustomCredentials`].
    CustomCredentials,
    /// [`PreAuthenticatedUserBadge`].
    PreAuthenticated,
    /// [`RememberMeBadge`].
    RememberMe,
}

impl BadgeKind {
    /// Human readable badge name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Self::User => "UserBadge",
            Self::PasswordCredentials => "PasswordCredentials",
            Self::CsrfToken => "CsrfTokenBadge",
            Self::CustomCredentials => "CustomCredentials",
            Self::PreAuthenticated => "PreAuthenticatedUserBadge",
            Self::RememberMe => "RememberMeBadge",
        }
    }
}

impl fmt::Display for BadgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A badge held by a [`Passport`](super::Passport).
#[derive(Debug)]
pub enum Badge {
    /// Identity to authenticate.
    User(UserBadge),
    /// Presented password.
    Password(PasswordCredentials),
    /// CSRF token sent with the login form.
    Csrf(CsrfTokenBadge),
    /// Arbitrary credential check.
    Custom(CustomCredentials),
    /// Identity was established by an upstream system.
    PreAuthenticated(PreAuthenticatedUserBadge),
    /// The user asked to be remembered.
    RememberMe(RememberMeBadge),
}

impl Badge {
    /// Discriminator of this badge.
    pub fn kind(&self) -> BadgeKind {
        match self {
            Self::User(_) => BadgeKind::User,
            Self::Password(_) => BadgeKind::PasswordCredentials,
            Self::Csrf(_) => BadgeKind::CsrfToken,
            Self::Custom(_) => BadgeKind::CustomCredentials,
            Self::PreAuthenticated(_) => BadgeKind::PreAuthenticated,
            Self::RememberMe(_) => BadgeKind::RememberMe,
        }
    }

    /// Whether the check behind this badge has approved it.
    pub fn is_resolved(&self) -> bool {
        match self {
            Self::User(badge) => badge.is_resolved(),
            Self::Password(badge) => badge.is_resolved(),
            Self::Csrf(badge) => badge.is_resolved(),
            Self::Custom(badge) => badge.is_resolved(),
            Self::PreAuthenticated(badge) => badge.is_resolved(),
            Self::RememberMe(badge) => badge.is_resolved(),
        }
    }
}

macro_rules! impl_into_badge {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Badge {
                fn from(badge: $ty) -> Self {
                    Self::$variant(badge)
                }
            }
        )*
    };
}

impl_into_badge! {
    UserBadge => User,
    PasswordCredentials => Password,
    CsrfTokenBadge => Csrf,
    CustomCredentials => Custom,
    PreAuthenticatedUserBadge => PreAuthenticated,
    RememberMeBadge => RememberMe,
}

/// Names the user to authenticate and loads it on demand.
///
/// The loader is an explicit [`UserProvider`] capability. The loaded user is
/// memoized, so every listener sees the same instance.
pub struct UserBadge {
    identifier: String,
    loader: Option<(Arc<dyn UserProvider>, LoadMethod)>,
    user: Option<UserRef>,
}

impl UserBadge {
    /// Creates a badge without a loader.
    ///
    /// Loading the user later fails with a logic error.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            loader: None,
            user: None,
        }
    }

    /// Creates a badge that loads its user through `loader`.
    pub fn with_loader(
        identifier: impl Into<String>,
        loader: Arc<dyn UserProvider>,
        method: LoadMethod,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            loader: Some((loader, method)),
            user: None,
        }
    }

    /// Creates a badge for an already loaded user.
    pub fn resolved(user: UserRef) -> Self {
        Self {
            identifier: user.username().to_string(),
            loader: None,
            user: Some(user),
        }
    }

    /// Identifier presented by the client.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The user, if it was loaded already.
    pub fn user(&self) -> Option<&UserRef> {
        self.user.as_ref()
    }

    /// Loads the user, once.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Logic`] if no loader is configured
    /// - [`AuthError::UserNotFound`] if the loader has no such user
    pub async fn load_user(&mut self) -> Result<UserRef, AuthError> {
        if let Some(user) = &self.user {
            return Ok(user.clone());
        }

        let (loader, method) = match &self.loader {
            Some((loader, method)) => (Arc::clone(loader), *method),
            None => {
                return Err(AuthError::Logic(format!(
                    "No user loader is configured for the user badge \"{}\".",
                    self.identifier
                )))
            }
        };

        let user = loader.load_with(method, &self.identifier).await?;
        self.user = Some(user.clone());
        Ok(user)
    }

    /// Always true: a missing user fails loading instead.
    pub fn is_resolved(&self) -> bool {
        true
    }
}

impl fmt::Debug for UserBadge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserBadge")
            .field("identifier", &self.identifier)
            .field("has_loader", &self.loader.is_some())
            .field("loaded", &self.user.is_some())
            .finish()
    }
}

/// Password presented by the client, wiped once checked.
pub struct PasswordCredentials {
    password: Option<Zeroizing<String>>,
    resolved: bool,
}

impl PasswordCredentials {
    /// Wraps a presented password.
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: Some(Zeroizing::new(password.into())),
            resolved: false,
        }
    }

    /// The presented password.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Logic`] once the badge was resolved.
    pub fn password(&self) -> Result<&str, AuthError> {
        self.password.as_deref().map(String::as_str).ok_or_else(|| {
            AuthError::Logic(
                "The credentials are erased as another listener already verified these credentials."
                    .into(),
            )
        })
    }

    /// Marks the password as verified and wipes it.
    pub fn mark_resolved(&mut self) {
        self.resolved = true;
        self.password = None;
    }

    /// Whether the password was verified.
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }
}

impl fmt::Debug for PasswordCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordCredentials")
            .field("password", &"[REDACTED]")
            .field("resolved", &self.resolved)
            .finish()
    }
}

/// CSRF token that must be valid for the login to proceed.
#[derive(Debug, Clone)]
pub struct CsrfTokenBadge {
    token_id: String,
    token: Option<String>,
    resolved: bool,
}

impl CsrfTokenBadge {
    /// Creates a badge for the token sent under `token_id`.
    pub fn new(token_id: impl Into<String>, token: Option<String>) -> Self {
        Self {
            token_id: token_id.into(),
            token,
            resolved: false,
        }
    }

    /// Identifier the token was generated for.
    pub fn token_id(&self) -> &str {
        &self.token_id
    }

    /// Token sent by the client.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Marks the token as valid.
    pub fn mark_resolved(&mut self) {
        self.resolved = true;
    }

    /// Whether the token was validated.
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }
}

/// Predicate deciding whether custom credentials are valid for a user.
pub type CredentialsChecker =
    Arc<dyn Fn(&Value, &dyn UserInterface) -> Result<bool, AuthError> + Send + Sync>;

/// Arbitrary credentials verified by a caller-supplied predicate.
pub struct CustomCredentials {
    checker: CredentialsChecker,
    credentials: Value,
    resolved: bool,
}

impl CustomCredentials {
    /// Creates the badge.
    pub fn new(checker: CredentialsChecker, credentials: Value) -> Self {
        Self {
            checker,
            credentials,
            resolved: false,
        }
    }

    /// Runs the predicate against `user`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::BadCredentials`] if the predicate returns false,
    /// or whatever error the predicate raised.
    pub fn execute_custom_checker(&mut self, user: &dyn UserInterface) -> Result<(), AuthError> {
        if !(self.checker)(&self.credentials, user)? {
            return Err(AuthError::BadCredentials(
                "Credentials check failed as the callable passed to CustomCredentials did not return \"true\"."
                    .into(),
            ));
        }

        self.resolved = true;
        Ok(())
    }

    /// Whether the predicate approved the credentials.
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }
}

impl fmt::Debug for CustomCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomCredentials")
            .field("credentials", &"[REDACTED]")
            .field("resolved", &self.resolved)
            .finish()
    }
}

/// The identity was established upstream; user checks before authentication are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreAuthenticatedUserBadge;

impl PreAuthenticatedUserBadge {
    /// Always true.
    pub fn is_resolved(&self) -> bool {
        true
    }
}

/// The login may issue a remember-me cookie.
#[derive(Debug, Clone, Copy, Default)]
pub struct RememberMeBadge;

impl RememberMeBadge {
    /// Always true.
    pub fn is_resolved(&self) -> bool {
        true
    }
}
