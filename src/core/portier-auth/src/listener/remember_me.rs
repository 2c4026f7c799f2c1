//! Issues and cancels remember-me cookies around logins.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::context::RequestContext;
use crate::event::{EventHandler, LoginFailureEvent, LoginSuccessEvent};
use crate::passport::BadgeKind;
use crate::remember_me::RememberMeServices;
use crate::AuthError;

/// Calls [`RememberMeServices::login_success`] when the passport carries a
/// [`RememberMeBadge`](crate::passport::RememberMeBadge) and the
/// authenticator produced a response to attach the cookie to.
pub struct RememberMeSuccessListener {
    services: Arc<RememberMeServices>,
}

impl RememberMeSuccessListener {
    /// Creates the listener.
    pub fn new(services: Arc<RememberMeServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl EventHandler<LoginSuccessEvent> for RememberMeSuccessListener {
    fn name(&self) -> &'static str {
        "remember_me_success"
    }

    async fn handle(
        &self,
        ctx: &mut RequestContext,
        event: &mut LoginSuccessEvent,
    ) -> Result<(), AuthError> {
        let has_badge = ctx
            .passport
            .as_ref()
            .is_some_and(|p| p.has_badge(BadgeKind::RememberMe));
        if !has_badge {
            debug!(authenticator = event.authenticator, "remember-me skipped: authenticator does not support it");
            return Ok(());
        }

        if ctx.response.is_none() {
            debug!(authenticator = event.authenticator, "remember-me skipped: no success response");
            return Ok(());
        }

        self.services.login_success(ctx, &event.token).await
    }
}

/// Cancels the remember-me cookie after a failed login.
pub struct RememberMeFailureListener {
    services: Arc<RememberMeServices>,
}

impl RememberMeFailureListener {
    /// Creates the listener.
    pub fn new(services: Arc<RememberMeServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl EventHandler<LoginFailureEvent> for RememberMeFailureListener {
    fn name(&self) -> &'static str {
        "remember_me_failure"
    }

    async fn handle(
        &self,
        ctx: &mut RequestContext,
        _event: &mut LoginFailureEvent,
    ) -> Result<(), AuthError> {
        self.services.login_fail(ctx).await;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::http::{Request, Response};
    use crate::passport::{Passport, RememberMeBadge, UserBadge};
    use crate::provider::InMemoryUserProvider;
    use crate::remember_me::{RememberMeOptions, SignatureStrategy};
    use crate::session::MemorySession;
    use crate::token::Token;
    use crate::user::User;
    use portier_crypto::SecretKey;

    fn services() -> Arc<RememberMeServices> {
        Arc::new(
            RememberMeServices::new(
                Arc::new(SignatureStrategy),
                RememberMeOptions {
                    always_remember_me: true,
                    ..RememberMeOptions::default()
                },
                "main",
                SecretKey::generate(),
                Arc::new(InMemoryUserProvider::new()),
            )
            .unwrap(),
        )
    }

    fn success_event() -> LoginSuccessEvent {
        let user = User::new("alice", Some("h".into())).unwrap().into_ref();
        LoginSuccessEvent {
            authenticator: "form_login",
            token: Token::post_authentication(user, "main", vec![]).unwrap(),
            realm: "main".into(),
        }
    }

    fn ctx(badges: Vec<crate::Badge>, response: Option<Response>) -> RequestContext {
        let user = User::new("alice", None).unwrap().into_ref();
        let mut ctx = RequestContext::new(Request::post("/login"), Arc::new(MemorySession::new()));
        ctx.passport = Some(Passport::self_validating(UserBadge::resolved(user), badges));
        ctx.response = response;
        ctx
    }

    fn issued(ctx: &RequestContext) -> bool {
        ctx.cookies
            .get("REMEMBERME", "/", None)
            .is_some_and(|c| !c.is_cleared())
    }

    #[tokio::test]
    async fn test_cookie_issued_with_badge_and_response() {
        let listener = RememberMeSuccessListener::new(services());
        let mut ctx = ctx(vec![RememberMeBadge.into()], Some(Response::redirect("/")));

        listener.handle(&mut ctx, &mut success_event()).await.unwrap();
        assert!(issued(&ctx));
    }

    #[tokio::test]
    async fn test_skipped_without_badge_or_response() {
        let listener = RememberMeSuccessListener::new(services());

        let mut no_badge = ctx(vec![], Some(Response::redirect("/")));
        listener.handle(&mut no_badge, &mut success_event()).await.unwrap();
        assert!(no_badge.cookies.is_empty());

        let mut no_response = ctx(vec![RememberMeBadge.into()], None);
        listener
            .handle(&mut no_response, &mut success_event())
            .await
            .unwrap();
        assert!(no_response.cookies.is_empty());
    }

    #[tokio::test]
    async fn test_failure_cancels_cookie() {
        let listener = RememberMeFailureListener::new(services());
        let mut ctx = ctx(vec![], None);
        let mut event = LoginFailureEvent {
            authenticator: "form_login",
            error: AuthError::BadCredentials("x".into()),
            realm: "main".into(),
        };

        listener.handle(&mut ctx, &mut event).await.unwrap();
        assert!(ctx.cookies.get("REMEMBERME", "/", None).unwrap().is_cleared());
    }
}
