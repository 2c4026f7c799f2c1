//! Remember-me as a last-resort authenticator.

use std::sync::Arc;

use async_trait::async_trait;

use super::Authenticator;
use crate::context::RequestContext;
use crate::passport::{Passport, UserBadge};
use crate::remember_me::RememberMeServices;
use crate::session::auth_username_key;
use crate::token::{Token, TokenUser};
use crate::AuthError;

/// Logs the user in from a remember-me cookie when no token is stored yet.
///
/// A token already established for the request is never replaced. Cookie
/// theft raised by the auto-login propagates to the caller.
pub struct RememberMeAuthenticator {
    services: Arc<RememberMeServices>,
}

impl RememberMeAuthenticator {
    /// Creates the authenticator.
    pub fn new(services: Arc<RememberMeServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Authenticator for RememberMeAuthenticator {
    fn name(&self) -> &'static str {
        "remember_me"
    }

    async fn supports(&self, ctx: &mut RequestContext) -> Result<bool, AuthError> {
        if ctx.token_storage.token().is_some() {
            return Ok(false);
        }

        if ctx.remember_me_token.is_none() {
            self.services.auto_login(ctx).await?;
        }

        Ok(ctx.remember_me_token.is_some())
    }

    async fn authenticate(&self, ctx: &mut RequestContext) -> Result<Passport, AuthError> {
        let user = match ctx.remember_me_token.as_ref().and_then(Token::user) {
            Some(TokenUser::Identity(user)) => user.clone(),
            _ => return Err(AuthError::Logic("No remember me token is set.".into())),
        };

        Ok(Passport::self_validating(UserBadge::resolved(user), []))
    }

    fn create_token(&self, passport: &Passport, realm: &str) -> Result<Token, AuthError> {
        Token::remember_me(passport.user()?, realm, self.services.secret().clone())
    }

    async fn on_success(
        &self,
        ctx: &mut RequestContext,
        _token: &Token,
        realm: &str,
    ) -> Result<(), AuthError> {
        ctx.session().remove(&auth_username_key(realm));
        Ok(())
    }

    async fn on_failure(&self, _ctx: &mut RequestContext, _error: &AuthError) -> Result<(), AuthError> {
        Ok(())
    }

    fn is_interactive(&self) -> bool {
        true
    }
}
