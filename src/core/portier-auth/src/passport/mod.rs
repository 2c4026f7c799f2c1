//! Passport: the bundle of badges gathered for one authentication attempt.

pub mod badge;

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

pub use badge::{
    Badge, BadgeKind, CredentialsChecker, CsrfTokenBadge, CustomCredentials, PasswordCredentials,
    PreAuthenticatedUserBadge, RememberMeBadge, UserBadge,
};

use crate::user::UserRef;
use crate::AuthError;

/// Badges and attributes for one authentication attempt.
///
/// Holds at most one badge per [`BadgeKind`]; adding a badge of a kind that
/// is already present replaces it.
#[derive(Debug, Default)]
pub struct Passport {
    badges: BTreeMap<BadgeKind, Badge>,
    attributes: HashMap<String, Value>,
    self_validating: bool,
}

impl Passport {
    /// Creates a passport whose credentials still have to be checked.
    pub fn new(
        user: UserBadge,
        credentials: impl Into<Badge>,
        badges: impl IntoIterator<Item = Badge>,
    ) -> Self {
        let mut passport = Self::default();
        passport.add_badge(user);
        passport.add_badge(credentials);
        for badge in badges {
            passport.add_badge(badge);
        }
        passport
    }

    /// Creates a passport for an identity that needs no credential check.
    pub fn self_validating(user: UserBadge, badges: impl IntoIterator<Item = Badge>) -> Self {
        let mut passport = Self::default();
        passport.self_validating = true;
        passport.add_badge(user);
        for badge in badges {
            passport.add_badge(badge);
        }
        passport
    }

    /// Creates a passport from arbitrary badges, possibly without a user.
    pub fn from_badges(badges: impl IntoIterator<Item = Badge>) -> Self {
        let mut passport = Self::default();
        for badge in badges {
            passport.add_badge(badge);
        }
        passport
    }

    /// Adds a badge, replacing any badge of the same kind.
    pub fn add_badge(&mut self, badge: impl Into<Badge>) -> &mut Self {
        let badge = badge.into();
        self.badges.insert(badge.kind(), badge);
        self
    }

    /// Whether a badge of `kind` is present.
    pub fn has_badge(&self, kind: BadgeKind) -> bool {
        self.badges.contains_key(&kind)
    }

    /// The badge of `kind`, if present.
    pub fn badge(&self, kind: BadgeKind) -> Option<&Badge> {
        self.badges.get(&kind)
    }

    /// All badges, ordered by kind.
    pub fn badges(&self) -> impl Iterator<Item = &Badge> {
        self.badges.values()
    }

    /// The user badge, if present.
    pub fn user_badge(&self) -> Option<&UserBadge> {
        match self.badges.get(&BadgeKind::User) {
            Some(Badge::User(badge)) => Some(badge),
            _ => None,
        }
    }

    /// The user badge, mutably.
    pub fn user_badge_mut(&mut self) -> Option<&mut UserBadge> {
        match self.badges.get_mut(&BadgeKind::User) {
            Some(Badge::User(badge)) => Some(badge),
            _ => None,
        }
    }

    /// The password badge, mutably.
    pub fn password_credentials_mut(&mut self) -> Option<&mut PasswordCredentials> {
        match self.badges.get_mut(&BadgeKind::PasswordCredentials) {
            Some(Badge::Password(badge)) => Some(badge),
            _ => None,
        }
    }

    /// The CSRF badge, mutably.
    pub fn csrf_token_mut(&mut self) -> Option<&mut CsrfTokenBadge> {
        match self.badges.get_mut(&BadgeKind::CsrfToken) {
            Some(Badge::Csrf(badge)) => Some(badge),
            _ => None,
        }
    }

    /// The custom credentials badge, mutably.
    pub fn custom_credentials_mut(&mut self) -> Option<&mut CustomCredentials> {
        match self.badges.get_mut(&BadgeKind::CustomCredentials) {
            Some(Badge::Custom(badge)) => Some(badge),
            _ => None,
        }
    }

    /// Fails with [`AuthError::BadCredentials`] if any badge is unresolved.
    pub fn check_if_completely_resolved(&self) -> Result<(), AuthError> {
        match self.badges.values().find(|badge| !badge.is_resolved()) {
            Some(badge) => Err(AuthError::BadCredentials(format!(
                "Authentication failed: security badge \"{}\" is not resolved, did you forget to register the correct listeners?",
                badge.kind()
            ))),
            None => Ok(()),
        }
    }

    /// Whether this passport was created without credentials to check.
    pub fn is_self_validating(&self) -> bool {
        self.self_validating
    }

    /// Whether this passport carries a user.
    pub fn has_user(&self) -> bool {
        self.user_badge().is_some()
    }

    /// Loads the user through the user badge.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Logic`] if the passport has no user badge
    /// - any error raised by the badge's loader
    pub async fn load_user(&mut self) -> Result<UserRef, AuthError> {
        match self.user_badge_mut() {
            Some(badge) => badge.load_user().await,
            None => Err(Self::missing_user()),
        }
    }

    /// The user loaded by the user badge.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Logic`] if there is no user badge or the user
    /// was not loaded yet.
    pub fn user(&self) -> Result<UserRef, AuthError> {
        let badge = self.user_badge().ok_or_else(Self::missing_user)?;
        badge.user().cloned().ok_or_else(|| {
            AuthError::Logic(format!(
                "The user \"{}\" has not been loaded yet.",
                badge.identifier()
            ))
        })
    }

    /// Sets an attribute.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: Value) {
        self.attributes.insert(name.into(), value);
    }

    /// Reads an attribute.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    fn missing_user() -> AuthError {
        AuthError::Logic("Passport does not contain a user.".into())
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::user::User;

    fn alice() -> UserRef {
        User::new("alice", None).unwrap().into_ref()
    }

    #[test]
    fn test_unresolved_badge_fails_check() {
        let passport = Passport::new(
            UserBadge::resolved(alice()),
            PasswordCredentials::new("wrong"),
            [],
        );

        match passport.check_if_completely_resolved() {
            Err(AuthError::BadCredentials(msg)) => assert!(msg.contains("PasswordCredentials")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_resolved_passport_passes_check() {
        let mut passport = Passport::new(
            UserBadge::resolved(alice()),
            PasswordCredentials::new("secret"),
            [RememberMeBadge.into()],
        );

        passport.password_credentials_mut().unwrap().mark_resolved();
        assert!(passport.check_if_completely_resolved().is_ok());
    }

    #[test]
    fn test_check_fails_iff_any_badge_unresolved() {
        let mut passport = Passport::from_badges([
            Badge::from(CsrfTokenBadge::new("authenticate", None)),
            Badge::from(PasswordCredentials::new("secret")),
        ]);
        assert!(passport.check_if_completely_resolved().is_err());

        passport.csrf_token_mut().unwrap().mark_resolved();
        assert!(passport.check_if_completely_resolved().is_err());

        passport.password_credentials_mut().unwrap().mark_resolved();
        assert!(passport.check_if_completely_resolved().is_ok());
    }

    #[test]
    fn test_adding_same_kind_replaces() {
        let mut passport = Passport::from_badges([]);
        passport.add_badge(CsrfTokenBadge::new("first", None));
        passport.add_badge(CsrfTokenBadge::new("second", None));

        assert_eq!(passport.badges().count(), 1);
        assert_eq!(passport.csrf_token_mut().unwrap().token_id(), "second");
    }

    #[test]
    fn test_user_requires_badge() {
        let passport = Passport::from_badges([RememberMeBadge.into()]);
        assert!(!passport.has_user());
        assert!(matches!(passport.user(), Err(AuthError::Logic(_))));
    }

    #[test]
    fn test_user_before_loading() {
        let passport = Passport::new(UserBadge::new("alice"), PasswordCredentials::new("x"), []);
        assert!(matches!(passport.user(), Err(AuthError::Logic(_))));
    }

    #[test]
    fn test_self_validating() {
        let passport = Passport::self_validating(UserBadge::resolved(alice()), []);
        assert!(passport.is_self_validating());
        assert!(passport.check_if_completely_resolved().is_ok());
        assert_eq!(passport.user().unwrap().username(), "alice");
    }

    #[test]
    fn test_attributes() {
        let mut passport = Passport::from_badges([]);
        passport.set_attribute("scope", Value::from("admin"));
        assert_eq!(passport.attribute("scope"), Some(&Value::from("admin")));
        assert_eq!(passport.attribute("missing"), None);
    }
}
