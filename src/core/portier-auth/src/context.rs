//! Per-exchange authentication context.

use std::sync::Arc;

use crate::http::{CookieJar, Request, Response};
use crate::passport::Passport;
use crate::session::Session;
use crate::token::{Token, TokenStorage};
use crate::AuthError;

/// Everything one request/response exchange carries through the pipeline.
///
/// Authenticators and listeners read the request and session from here and
/// write the response, outgoing cookies and stored token back into it.
#[derive(Debug)]
pub struct RequestContext {
    /// Inbound request.
    pub request: Request,
    /// Response to short-circuit the exchange with, if any.
    pub response: Option<Response>,
    /// Cookies to set or clear on the response.
    pub cookies: CookieJar,
    /// Token of the current exchange.
    pub token_storage: TokenStorage,
    /// Passport of the attempt in progress.
    pub passport: Option<Passport>,
    /// Token produced by a remember-me auto-login during this exchange.
    pub remember_me_token: Option<Token>,
    session: Arc<dyn Session>,
}

impl RequestContext {
    /// Creates a context with an empty token storage.
    pub fn new(request: Request, session: Arc<dyn Session>) -> Self {
        Self {
            request,
            response: None,
            cookies: CookieJar::new(),
            token_storage: TokenStorage::new(),
            passport: None,
            remember_me_token: None,
            session,
        }
    }

    /// Replaces the token storage, e.g. with one restored from the session.
    pub fn with_token_storage(mut self, token_storage: TokenStorage) -> Self {
        self.token_storage = token_storage;
        self
    }

    /// Session bound to this exchange.
    pub fn session(&self) -> &dyn Session {
        self.session.as_ref()
    }

    /// Shared handle to the session.
    pub fn session_handle(&self) -> Arc<dyn Session> {
        Arc::clone(&self.session)
    }

    /// Passport of the attempt in progress.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Logic`] outside of an authentication attempt.
    pub fn passport(&self) -> Result<&Passport, AuthError> {
        self.passport.as_ref().ok_or_else(no_passport)
    }

    /// Passport of the attempt in progress, mutably.
    pub fn passport_mut(&mut self) -> Result<&mut Passport, AuthError> {
        self.passport.as_mut().ok_or_else(no_passport)
    }
}

fn no_passport() -> AuthError {
    AuthError::Logic("No authentication is in progress.".into())
}
