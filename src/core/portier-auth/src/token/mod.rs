//! Authenticated identity records.

pub mod storage;

use std::collections::{HashMap, HashSet};
use std::fmt;

use portier_crypto::SecretKey;
use serde_json::Value;

pub use storage::TokenStorage;

use crate::user::{UserInterface, UserRef};
use crate::AuthError;

/// The user a token was issued for.
#[derive(Debug, Clone)]
pub enum TokenUser {
    /// A resolved identity.
    Identity(UserRef),
    /// A bare identifier.
    Identifier(String),
}

impl TokenUser {
    /// Username of the identity, or the identifier itself.
    pub fn username(&self) -> &str {
        match self {
            Self::Identity(user) => user.username(),
            Self::Identifier(identifier) => identifier,
        }
    }

    /// The resolved identity, if any.
    pub fn as_user(&self) -> Option<&UserRef> {
        match self {
            Self::Identity(user) => Some(user),
            Self::Identifier(_) => None,
        }
    }
}

impl From<UserRef> for TokenUser {
    fn from(user: UserRef) -> Self {
        Self::Identity(user)
    }
}

impl From<String> for TokenUser {
    fn from(identifier: String) -> Self {
        Self::Identifier(identifier)
    }
}

impl From<&str> for TokenUser {
    fn from(identifier: &str) -> Self {
        Self::Identifier(identifier.to_string())
    }
}

/// Kind of token, with its kind-specific payload.
#[derive(Clone)]
pub enum TokenKind {
    /// Issued after a successful passport check.
    PostAuthentication,
    /// Username and password login.
    UsernamePassword {
        /// Credentials, until erased.
        credentials: Option<String>,
    },
    /// Identity established by an upstream system.
    PreAuthenticated {
        /// Credentials, until erased.
        credentials: Option<String>,
    },
    /// Identity restored from a remember-me cookie.
    RememberMe {
        /// Secret of the remember-me services that issued the token.
        secret: SecretKey,
    },
    /// A user impersonating another one.
    SwitchUser {
        /// Credentials, until erased.
        credentials: Option<String>,
        /// Token of the impersonating user.
        original: Box<Token>,
        /// URI the switch was requested from.
        originated_from_uri: Option<String>,
    },
}

impl TokenKind {
    /// Name used in the token's display form.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PostAuthentication => "PostAuthenticationToken",
            Self::UsernamePassword { .. } => "UsernamePasswordToken",
            Self::PreAuthenticated { .. } => "PreAuthenticatedToken",
            Self::RememberMe { .. } => "RememberMeToken",
            Self::SwitchUser { .. } => "SwitchUserToken",
        }
    }
}

impl fmt::Debug for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Authenticated identity record.
///
/// One type covers every kind; the user-change invariant lives in
/// [`Token::set_user`] only.
#[derive(Debug, Clone)]
pub struct Token {
    kind: TokenKind,
    user: Option<TokenUser>,
    roles: Vec<String>,
    authenticated: bool,
    attributes: HashMap<String, Value>,
    realm: String,
}

impl Token {
    fn build(
        kind: TokenKind,
        user: TokenUser,
        realm: String,
        roles: Vec<String>,
        authenticated: bool,
    ) -> Result<Self, AuthError> {
        if realm.is_empty() {
            return Err(AuthError::InvalidArgument(
                "The realm must not be empty.".into(),
            ));
        }

        Ok(Self {
            kind,
            user: Some(user),
            roles,
            authenticated,
            attributes: HashMap::new(),
            realm,
        })
    }

    /// Token minted once a passport is fully resolved. Always authenticated.
    pub fn post_authentication(
        user: UserRef,
        realm: impl Into<String>,
        roles: Vec<String>,
    ) -> Result<Self, AuthError> {
        Self::build(
            TokenKind::PostAuthentication,
            user.into(),
            realm.into(),
            roles,
            true,
        )
    }

    /// Username/password token. Authenticated iff roles were granted.
    pub fn username_password(
        user: impl Into<TokenUser>,
        credentials: Option<String>,
        realm: impl Into<String>,
        roles: Vec<String>,
    ) -> Result<Self, AuthError> {
        let authenticated = !roles.is_empty();
        Self::build(
            TokenKind::UsernamePassword { credentials },
            user.into(),
            realm.into(),
            roles,
            authenticated,
        )
    }

    /// Pre-authenticated token. Authenticated iff roles were granted.
    pub fn pre_authenticated(
        user: impl Into<TokenUser>,
        credentials: Option<String>,
        realm: impl Into<String>,
        roles: Vec<String>,
    ) -> Result<Self, AuthError> {
        let authenticated = !roles.is_empty();
        Self::build(
            TokenKind::PreAuthenticated { credentials },
            user.into(),
            realm.into(),
            roles,
            authenticated,
        )
    }

    /// Remember-me token carrying the user's roles.
    pub fn remember_me(
        user: UserRef,
        realm: impl Into<String>,
        secret: SecretKey,
    ) -> Result<Self, AuthError> {
        if secret.as_bytes().is_empty() {
            return Err(AuthError::InvalidArgument(
                "The secret must not be empty.".into(),
            ));
        }

        let roles = user.roles().to_vec();
        Self::build(
            TokenKind::RememberMe { secret },
            user.into(),
            realm.into(),
            roles,
            true,
        )
    }

    /// Impersonation token wrapping the impersonator's token.
    pub fn switch_user(
        user: impl Into<TokenUser>,
        credentials: Option<String>,
        realm: impl Into<String>,
        roles: Vec<String>,
        original: Token,
        originated_from_uri: Option<String>,
    ) -> Result<Self, AuthError> {
        let authenticated = !roles.is_empty();
        Self::build(
            TokenKind::SwitchUser {
                credentials,
                original: Box::new(original),
                originated_from_uri,
            },
            user.into(),
            realm.into(),
            roles,
            authenticated,
        )
    }

    /// Kind of this token.
    pub fn kind(&self) -> &TokenKind {
        &self.kind
    }

    /// Realm (firewall) this token belongs to.
    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Granted roles.
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    /// User of this token.
    pub fn user(&self) -> Option<&TokenUser> {
        self.user.as_ref()
    }

    /// Username of this token's user, or an empty string.
    pub fn username(&self) -> &str {
        self.user.as_ref().map(TokenUser::username).unwrap_or_default()
    }

    /// Whether the token asserts an authenticated identity.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Sets the authenticated flag.
    ///
    /// # Errors
    ///
    /// Kinds whose authentication is decided at construction refuse to be
    /// marked authenticated afterwards.
    pub fn set_authenticated(&mut self, authenticated: bool) -> Result<(), AuthError> {
        if authenticated && !matches!(self.kind, TokenKind::PostAuthentication) {
            return Err(AuthError::Logic(format!(
                "Cannot set a {} as authenticated after creation, create a new token instead.",
                self.kind.name()
            )));
        }

        self.authenticated = authenticated;
        Ok(())
    }

    /// Replaces the user.
    ///
    /// The token stops being authenticated unless the new user is equal to
    /// the current one.
    pub fn set_user(&mut self, user: impl Into<TokenUser>) {
        let user = user.into();

        let changed = match &self.user {
            None => false,
            Some(current) => self.has_user_changed(current, &user),
        };

        self.user = Some(user);

        if changed {
            self.authenticated = false;
        }
    }

    fn has_user_changed(&self, current: &TokenUser, new: &TokenUser) -> bool {
        match (current, new) {
            (TokenUser::Identity(current), TokenUser::Identity(new)) => {
                self.has_identity_changed(current.as_ref(), new.as_ref())
            }
            (TokenUser::Identifier(current), TokenUser::Identifier(new)) => current != new,
            _ => true,
        }
    }

    fn has_identity_changed(&self, current: &dyn UserInterface, new: &dyn UserInterface) -> bool {
        if let Some(equal) = current.is_equal_to(new) {
            return !equal;
        }

        if current.password() != new.password() {
            return true;
        }

        let new_roles: HashSet<&str> = new.roles().iter().map(String::as_str).collect();
        let token_roles: HashSet<&str> = self.roles.iter().map(String::as_str).collect();
        if new_roles != token_roles {
            return true;
        }

        current.username() != new.username()
    }

    /// Credentials still held by the token.
    pub fn credentials(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::UsernamePassword { credentials }
            | TokenKind::PreAuthenticated { credentials }
            | TokenKind::SwitchUser { credentials, .. } => credentials.as_deref(),
            TokenKind::PostAuthentication | TokenKind::RememberMe { .. } => None,
        }
    }

    /// Removes sensitive data from the token and its user.
    pub fn erase_credentials(&mut self) {
        match &mut self.kind {
            TokenKind::UsernamePassword { credentials }
            | TokenKind::PreAuthenticated { credentials }
            | TokenKind::SwitchUser { credentials, .. } => *credentials = None,
            TokenKind::PostAuthentication | TokenKind::RememberMe { .. } => {}
        }

        if let Some(TokenUser::Identity(user)) = &self.user {
            if let Some(stripped) = user.without_credentials() {
                self.user = Some(TokenUser::Identity(stripped));
            }
        }
    }

    /// Secret of a remember-me token.
    pub fn secret(&self) -> Option<&SecretKey> {
        match &self.kind {
            TokenKind::RememberMe { secret } => Some(secret),
            _ => None,
        }
    }

    /// Token of the impersonating user, for switch-user tokens.
    pub fn original_token(&self) -> Option<&Token> {
        match &self.kind {
            TokenKind::SwitchUser { original, .. } => Some(original),
            _ => None,
        }
    }

    /// URI the impersonation was requested from.
    pub fn originated_from_uri(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::SwitchUser {
                originated_from_uri,
                ..
            } => originated_from_uri.as_deref(),
            _ => None,
        }
    }

    /// All attributes.
    pub fn attributes(&self) -> &HashMap<String, Value> {
        &self.attributes
    }

    /// Replaces all attributes.
    pub fn set_attributes(&mut self, attributes: HashMap<String, Value>) {
        self.attributes = attributes;
    }

    /// Whether an attribute is set.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Reads an attribute.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidArgument`] if the attribute is missing.
    pub fn attribute(&self, name: &str) -> Result<&Value, AuthError> {
        self.attributes.get(name).ok_or_else(|| {
            AuthError::InvalidArgument(format!("This token has no \"{name}\" attribute."))
        })
    }

    /// Sets an attribute.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: Value) {
        self.attributes.insert(name.into(), value);
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}(user=\"{}\", authenticated={}, roles=\"{}\")",
            self.kind.name(),
            self.username(),
            self.authenticated,
            self.roles.join(", ")
        )
    }
}
