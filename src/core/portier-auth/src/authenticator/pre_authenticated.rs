//! Identities established upstream, e.g. by a reverse proxy.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::Authenticator;
use crate::config::RemoteUserOptions;
use crate::context::RequestContext;
use crate::passport::{Passport, PreAuthenticatedUserBadge, UserBadge};
use crate::provider::{LoadMethod, UserProvider};
use crate::session::auth_username_key;
use crate::token::{Token, TokenKind};
use crate::AuthError;

/// Extracts the pre-authenticated username from a request.
pub trait UsernameExtractor: Send + Sync {
    /// Returns the username, `None` when the request carries none.
    ///
    /// # Errors
    ///
    /// Returns an authentication failure when the source is missing; the
    /// authenticator then skips the request.
    fn extract_username(&self, ctx: &RequestContext, realm: &str) -> Result<Option<String>, AuthError>;
}

/// Reads the username a fronting server put into the request.
///
/// Looks at the session first, then a request attribute, then the server
/// parameter named by `user_key`.
#[derive(Debug, Clone)]
pub struct RemoteUserExtractor {
    user_key: String,
}

impl RemoteUserExtractor {
    /// Creates the extractor.
    pub fn new(options: RemoteUserOptions) -> Self {
        Self {
            user_key: options.user_key,
        }
    }
}

impl UsernameExtractor for RemoteUserExtractor {
    fn extract_username(&self, ctx: &RequestContext, realm: &str) -> Result<Option<String>, AuthError> {
        if let Some(username) = ctx
            .session()
            .get(&auth_username_key(realm))
            .and_then(|v| v.as_str().map(str::to_string))
            .filter(|u| !u.is_empty())
        {
            return Ok(Some(username));
        }

        if let Some(username) = ctx.request.attribute(&self.user_key).filter(|u| !u.is_empty()) {
            return Ok(Some(username.to_string()));
        }

        match ctx.request.server_param(&self.user_key) {
            Some(username) => Ok(Some(username.to_string())),
            None => Err(AuthError::BadCredentials(format!(
                "User key was not found: \"{}\".",
                self.user_key
            ))),
        }
    }
}

/// Authenticates users whose identity was established before the request
/// reached this service.
pub struct PreAuthenticatedAuthenticator<E> {
    extractor: E,
    realm: String,
    user_provider: Arc<dyn UserProvider>,
    load_method: LoadMethod,
}

/// Pre-authenticated authenticator reading `REMOTE_USER`-style parameters.
pub type RemoteUserAuthenticator = PreAuthenticatedAuthenticator<RemoteUserExtractor>;

impl<E: UsernameExtractor> PreAuthenticatedAuthenticator<E> {
    /// Creates the authenticator.
    pub fn new(
        extractor: E,
        realm: impl Into<String>,
        user_provider: Arc<dyn UserProvider>,
        load_method: LoadMethod,
    ) -> Self {
        Self {
            extractor,
            realm: realm.into(),
            user_provider,
            load_method,
        }
    }

    fn clear_token(&self, ctx: &mut RequestContext, error: &AuthError) {
        let is_ours = ctx.token_storage.token().is_some_and(|token| {
            matches!(token.kind(), TokenKind::PreAuthenticated { .. }) && token.realm() == self.realm
        });

        if is_ours {
            ctx.token_storage.clear();
            info!(realm = %self.realm, error = %error, "cleared pre-authenticated token due to an exception");
        }
    }
}

#[async_trait]
impl<E: UsernameExtractor> Authenticator for PreAuthenticatedAuthenticator<E> {
    fn name(&self) -> &'static str {
        "pre_authenticated"
    }

    async fn supports(&self, ctx: &mut RequestContext) -> Result<bool, AuthError> {
        match self.extractor.extract_username(ctx, &self.realm) {
            Ok(Some(username)) if !username.is_empty() => Ok(true),
            Ok(_) => {
                debug!(realm = %self.realm, "skipping pre-authenticated authenticator: no username");
                Ok(false)
            }
            Err(e) if e.is_authentication_failure() => {
                self.clear_token(ctx, &e);
                debug!(realm = %self.realm, error = %e, "skipping pre-authenticated authenticator");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn authenticate(&self, ctx: &mut RequestContext) -> Result<Passport, AuthError> {
        let username = self
            .extractor
            .extract_username(ctx, &self.realm)?
            .ok_or_else(|| AuthError::BadCredentials("No pre-authenticated username.".into()))?;

        let mut passport = Passport::self_validating(
            UserBadge::with_loader(username, Arc::clone(&self.user_provider), self.load_method),
            [PreAuthenticatedUserBadge.into()],
        );
        // No credential listener runs for this passport, so the user is loaded here.
        passport.load_user().await?;

        Ok(passport)
    }

    fn create_token(&self, passport: &Passport, realm: &str) -> Result<Token, AuthError> {
        let user = passport.user()?;
        let roles = user.roles().to_vec();
        Token::pre_authenticated(user, None, realm, roles)
    }

    async fn on_success(
        &self,
        _ctx: &mut RequestContext,
        _token: &Token,
        _realm: &str,
    ) -> Result<(), AuthError> {
        Ok(())
    }

    async fn on_failure(&self, ctx: &mut RequestContext, error: &AuthError) -> Result<(), AuthError> {
        self.clear_token(ctx, error);
        Ok(())
    }

    fn is_interactive(&self) -> bool {
        true
    }
}
