//! Request guard in front of application handlers.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::context::RequestContext;
use crate::http::Response;
use crate::manager::AuthManager;
use crate::AuthError;

/// Application code protected by the middleware.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Produces the response for an authenticated (or anonymous) request.
    async fn handle(&self, ctx: &mut RequestContext) -> Result<Response, AuthError>;
}

/// Runs authentication before handing the request to the application.
#[derive(Clone)]
pub struct AuthMiddleware {
    manager: Arc<AuthManager>,
}

impl AuthMiddleware {
    /// Creates the middleware.
    pub fn new(manager: Arc<AuthManager>) -> Self {
        Self { manager }
    }

    /// Processes one request.
    ///
    /// A request that already carries an authenticated token skips
    /// authentication. Otherwise the response produced by an authenticator
    /// short-circuits the handler.
    pub async fn process(
        &self,
        ctx: &mut RequestContext,
        handler: &dyn RequestHandler,
    ) -> Result<Response, AuthError> {
        if ctx.token_storage.is_authenticated() {
            return handler.handle(ctx).await;
        }

        self.manager.authenticate(ctx).await?;

        if let Some(response) = ctx.response.take() {
            debug!(realm = %self.manager.realm(), status = response.status(), "authentication produced the response");
            return Ok(response);
        }

        handler.handle(ctx).await
    }
}
