//! Authenticator trait and the built-in authenticators.

mod form_login;
mod http_basic;
mod json_login;
mod pre_authenticated;
mod remember_me;

use async_trait::async_trait;

pub use form_login::FormLoginAuthenticator;
pub use http_basic::HttpBasicAuthenticator;
pub use json_login::JsonLoginAuthenticator;
pub use pre_authenticated::{
    PreAuthenticatedAuthenticator, RemoteUserAuthenticator, RemoteUserExtractor,
    UsernameExtractor,
};
pub use remember_me::RememberMeAuthenticator;

use crate::context::RequestContext;
use crate::passport::Passport;
use crate::token::Token;
use crate::AuthError;

/// Strategy that turns a request into a [`Passport`] and reacts to the outcome.
///
/// The [`AuthManager`](crate::AuthManager) calls `supports` first; an
/// authenticator that returns false is skipped entirely. Responses are
/// produced by setting [`RequestContext::response`].
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Name used in logs and events.
    fn name(&self) -> &'static str;

    /// Whether this authenticator handles the request.
    async fn supports(&self, ctx: &mut RequestContext) -> Result<bool, AuthError>;

    /// Gathers the badges to verify.
    async fn authenticate(&self, ctx: &mut RequestContext) -> Result<Passport, AuthError>;

    /// Mints the token for a fully resolved passport.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Logic`] if the passport has no loaded user.
    fn create_token(&self, passport: &Passport, realm: &str) -> Result<Token, AuthError> {
        let user = passport.user()?;
        let roles = user.roles().to_vec();
        Token::post_authentication(user, realm, roles)
    }

    /// Called once the token is stored.
    async fn on_success(
        &self,
        ctx: &mut RequestContext,
        token: &Token,
        realm: &str,
    ) -> Result<(), AuthError>;

    /// Called when authentication failed.
    async fn on_failure(&self, ctx: &mut RequestContext, error: &AuthError) -> Result<(), AuthError>;

    /// Whether a success counts as an interactive login.
    fn is_interactive(&self) -> bool {
        false
    }
}
