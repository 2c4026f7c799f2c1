//! Logout listeners.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ClearCookie;
use crate::context::RequestContext;
use crate::csrf::CsrfTokenManager;
use crate::event::{EventHandler, LogoutEvent};
use crate::http::Response;
use crate::remember_me::RememberMeServices;
use crate::AuthError;

/// Clears the token and redirects to the logout target unless another
/// listener already set a response.
#[derive(Debug, Clone)]
pub struct DefaultLogoutListener {
    target: String,
}

impl DefaultLogoutListener {
    /// Creates the listener.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

#[async_trait]
impl EventHandler<LogoutEvent> for DefaultLogoutListener {
    fn name(&self) -> &'static str {
        "default_logout"
    }

    fn priority(&self) -> i32 {
        64
    }

    async fn handle(&self, ctx: &mut RequestContext, _event: &mut LogoutEvent) -> Result<(), AuthError> {
        ctx.token_storage.clear();
        if ctx.response.is_none() {
            ctx.response = Some(Response::redirect(self.target.clone()));
        }
        Ok(())
    }
}

/// Invalidates the session.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionLogoutListener;

#[async_trait]
impl EventHandler<LogoutEvent> for SessionLogoutListener {
    fn name(&self) -> &'static str {
        "session_logout"
    }

    async fn handle(&self, ctx: &mut RequestContext, _event: &mut LogoutEvent) -> Result<(), AuthError> {
        ctx.session().invalidate();
        Ok(())
    }
}

/// Cancels the remember-me cookie of the user logging out.
pub struct RememberMeLogoutListener {
    services: Arc<RememberMeServices>,
}

impl RememberMeLogoutListener {
    /// Creates the listener.
    pub fn new(services: Arc<RememberMeServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl EventHandler<LogoutEvent> for RememberMeLogoutListener {
    fn name(&self) -> &'static str {
        "remember_me_logout"
    }

    async fn handle(&self, ctx: &mut RequestContext, event: &mut LogoutEvent) -> Result<(), AuthError> {
        if event.token.is_none() {
            return Ok(());
        }

        if ctx.response.is_none() {
            return Err(AuthError::Logic(
                "No response was set for this logout action. Make sure the default logout listener or another listener has set the response before the remember-me logout listener runs.".into(),
            ));
        }

        self.services.logout(ctx).await;
        Ok(())
    }
}

/// Forgets every CSRF token.
pub struct CsrfTokenClearingLogoutListener {
    manager: Arc<dyn CsrfTokenManager>,
}

impl CsrfTokenClearingLogoutListener {
    /// Creates the listener.
    pub fn new(manager: Arc<dyn CsrfTokenManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl EventHandler<LogoutEvent> for CsrfTokenClearingLogoutListener {
    fn name(&self) -> &'static str {
        "csrf_token_clearing"
    }

    async fn handle(&self, _ctx: &mut RequestContext, _event: &mut LogoutEvent) -> Result<(), AuthError> {
        self.manager.clear();
        Ok(())
    }
}

/// Clears the configured cookies on the client.
#[derive(Debug, Clone)]
pub struct CookieClearingLogoutListener {
    cookies: Vec<ClearCookie>,
}

impl CookieClearingLogoutListener {
    /// Creates the listener.
    pub fn new(cookies: Vec<ClearCookie>) -> Self {
        Self { cookies }
    }
}

#[async_trait]
impl EventHandler<LogoutEvent> for CookieClearingLogoutListener {
    fn name(&self) -> &'static str {
        "cookie_clearing"
    }

    fn priority(&self) -> i32 {
        -255
    }

    async fn handle(&self, ctx: &mut RequestContext, _event: &mut LogoutEvent) -> Result<(), AuthError> {
        for cookie in &self.cookies {
            ctx.cookies
                .forget(&cookie.name, &cookie.path, cookie.domain.as_deref());
        }
        Ok(())
    }
}
