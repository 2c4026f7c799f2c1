//! HTTP basic authentication.

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::info;

use super::Authenticator;
use crate::config::HttpBasicOptions;
use crate::context::RequestContext;
use crate::http::{Request, Response};
use crate::passport::{Passport, PasswordCredentials, UserBadge};
use crate::provider::{LoadMethod, UserProvider};
use crate::token::Token;
use crate::AuthError;

const SCHEME: &str = "Basic ";

/// Authenticates `Authorization: Basic` credentials.
///
/// Success lets the request continue; failure answers 401 with a
/// `WWW-Authenticate` challenge.
pub struct HttpBasicAuthenticator {
    options: HttpBasicOptions,
    user_provider: Arc<dyn UserProvider>,
    load_method: LoadMethod,
}

impl HttpBasicAuthenticator {
    /// Creates the authenticator.
    pub fn new(
        options: HttpBasicOptions,
        user_provider: Arc<dyn UserProvider>,
        load_method: LoadMethod,
    ) -> Self {
        Self {
            options,
            user_provider,
            load_method,
        }
    }

    fn encoded_credentials(request: &Request) -> Option<&str> {
        let header = request.header("authorization")?;
        let scheme = header.get(..SCHEME.len())?;
        scheme
            .eq_ignore_ascii_case(SCHEME)
            .then(|| header[SCHEME.len()..].trim())
    }

    fn credentials(request: &Request) -> Result<(String, String), AuthError> {
        let malformed = || AuthError::BadCredentials("Malformed basic credentials.".into());

        let encoded = Self::encoded_credentials(request).ok_or_else(malformed)?;
        let decoded = STANDARD.decode(encoded).map_err(|_| malformed())?;
        let decoded = String::from_utf8(decoded).map_err(|_| malformed())?;
        let (username, password) = decoded.split_once(':').ok_or_else(malformed)?;

        Ok((username.to_string(), password.to_string()))
    }
}

#[async_trait]
impl Authenticator for HttpBasicAuthenticator {
    fn name(&self) -> &'static str {
        "http_basic"
    }

    async fn supports(&self, ctx: &mut RequestContext) -> Result<bool, AuthError> {
        Ok(Self::encoded_credentials(&ctx.request).is_some())
    }

    async fn authenticate(&self, ctx: &mut RequestContext) -> Result<Passport, AuthError> {
        let (username, password) = Self::credentials(&ctx.request)?;

        Ok(Passport::new(
            UserBadge::with_loader(username, Arc::clone(&self.user_provider), self.load_method),
            PasswordCredentials::new(password),
            [],
        ))
    }

    fn create_token(&self, passport: &Passport, realm: &str) -> Result<Token, AuthError> {
        let user = passport.user()?;
        let roles = user.roles().to_vec();
        Token::username_password(user, None, realm, roles)
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
        let username = Self::credentials(&ctx.request)
            .map(|(username, _)| username)
            .unwrap_or_default();
        info!(user = %username, error = %error, "basic authentication failed");

        ctx.response = Some(Response::new(401).with_header(
            "WWW-Authenticate",
            format!("Basic realm=\"{}\"", self.options.realm_name),
        ));
        Ok(())
    }
}
