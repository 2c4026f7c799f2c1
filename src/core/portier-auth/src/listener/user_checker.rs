//! Account status checks around authentication.

use std::sync::Arc;

use async_trait::async_trait;

use crate::checker::UserChecker;
use crate::context::RequestContext;
use crate::event::{CheckPassportEvent, EventHandler, LoginSuccessEvent};
use crate::passport::BadgeKind;
use crate::token::TokenUser;
use crate::AuthError;

/// Runs [`UserChecker::check_pre_auth`] before credentials are checked.
///
/// Skipped for pre-authenticated passports and passports without a user.
pub struct UserCheckerPreAuthListener {
    checker: Arc<dyn UserChecker>,
}

impl UserCheckerPreAuthListener {
    /// Creates the listener.
    pub fn new(checker: Arc<dyn UserChecker>) -> Self {
        Self { checker }
    }
}

#[async_trait]
impl EventHandler<CheckPassportEvent> for UserCheckerPreAuthListener {
    fn name(&self) -> &'static str {
        "user_checker_pre_auth"
    }

    fn priority(&self) -> i32 {
        256
    }

    async fn handle(
        &self,
        ctx: &mut RequestContext,
        _event: &mut CheckPassportEvent,
    ) -> Result<(), AuthError> {
        let passport = ctx.passport_mut()?;
        if passport.has_badge(BadgeKind::PreAuthenticated) || !passport.has_user() {
            return Ok(());
        }

        let user = passport.load_user().await?;
        self.checker.check_pre_auth(&user)
    }
}

/// Runs [`UserChecker::check_post_auth`] once the login succeeded.
pub struct UserCheckerPostAuthListener {
    checker: Arc<dyn UserChecker>,
}

impl UserCheckerPostAuthListener {
    /// Creates the listener.
    pub fn new(checker: Arc<dyn UserChecker>) -> Self {
        Self { checker }
    }
}

#[async_trait]
impl EventHandler<LoginSuccessEvent> for UserCheckerPostAuthListener {
    fn name(&self) -> &'static str {
        "user_checker_post_auth"
    }

    fn priority(&self) -> i32 {
        256
    }

    async fn handle(
        &self,
        _ctx: &mut RequestContext,
        event: &mut LoginSuccessEvent,
    ) -> Result<(), AuthError> {
        match event.token.user() {
            Some(TokenUser::Identity(user)) => self.checker.check_post_auth(user),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::checker::DefaultUserChecker;
    use crate::http::Request;
    use crate::passport::{Passport, PreAuthenticatedUserBadge, RememberMeBadge, UserBadge};
    use crate::session::MemorySession;
    use crate::token::Token;
    use crate::user::User;

    fn ctx_with(passport: Passport) -> RequestContext {
        let mut ctx = RequestContext::new(Request::get("/"), Arc::new(MemorySession::new()));
        ctx.passport = Some(passport);
        ctx
    }

    #[tokio::test]
    async fn test_pre_auth_rejects_locked_user() {
        let listener = UserCheckerPreAuthListener::new(Arc::new(DefaultUserChecker));
        let user = User::new("alice", None)
            .unwrap()
            .with_account_non_locked(false)
            .into_ref();

        let mut ctx = ctx_with(Passport::self_validating(UserBadge::resolved(user), []));
        let result = listener
            .handle(&mut ctx, &mut CheckPassportEvent { authenticator: "test" })
            .await;
        assert!(matches!(result, Err(AuthError::Locked { .. })));
    }

    #[tokio::test]
    async fn test_pre_auth_skipped_for_pre_authenticated() {
        let listener = UserCheckerPreAuthListener::new(Arc::new(DefaultUserChecker));
        let user = User::new("alice", None)
            .unwrap()
            .with_enabled(false)
            .into_ref();

        let mut ctx = ctx_with(Passport::self_validating(
            UserBadge::resolved(user),
            [PreAuthenticatedUserBadge.into()],
        ));
        listener
            .handle(&mut ctx, &mut CheckPassportEvent { authenticator: "test" })
            .await
            .unwrap();

        let mut no_user = ctx_with(Passport::from_badges([RememberMeBadge.into()]));
        listener
            .handle(&mut no_user, &mut CheckPassportEvent { authenticator: "test" })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_post_auth_rejects_expired_credentials() {
        let listener = UserCheckerPostAuthListener::new(Arc::new(DefaultUserChecker));
        let user = User::new("alice", None)
            .unwrap()
            .with_credentials_non_expired(false)
            .into_ref();

        let mut ctx = ctx_with(Passport::from_badges([]));
        let mut event = LoginSuccessEvent {
            authenticator: "test",
            token: Token::post_authentication(user, "main", vec![]).unwrap(),
            realm: "main".into(),
        };
        assert!(matches!(
            listener.handle(&mut ctx, &mut event).await,
            Err(AuthError::CredentialsExpired { .. })
        ));
    }
}
