//! Typed event pipelines dispatched by the [`AuthManager`](crate::AuthManager).
//!
//! Each lifecycle point has its own event type and its own [`Pipeline`].
//! Handlers run by descending priority; handlers with equal priority run in
//! registration order. The first handler error stops the dispatch.

use std::cmp::Reverse;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::RequestContext;
use crate::token::Token;
use crate::AuthError;

/// Handles one event type.
#[async_trait]
pub trait EventHandler<E>: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Higher priorities run first.
    fn priority(&self) -> i32 {
        0
    }

    /// Handles the event.
    async fn handle(&self, ctx: &mut RequestContext, event: &mut E) -> Result<(), AuthError>;
}

/// Ordered list of handlers for one event type.
pub struct Pipeline<E> {
    handlers: Vec<Arc<dyn EventHandler<E>>>,
}

impl<E> Default for Pipeline<E> {
    fn default() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }
}

impl<E> fmt::Debug for Pipeline<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.handlers.iter().map(|h| (h.name(), h.priority())))
            .finish()
    }
}

impl<E: Send> Pipeline<E> {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler at its priority.
    pub fn register(&mut self, handler: Arc<dyn EventHandler<E>>) {
        self.handlers.push(handler);
        self.handlers.sort_by_key(|h| Reverse(h.priority()));
    }

    /// Number of handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Handler names in dispatch order.
    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Runs every handler in order, stopping at the first error.
    pub async fn dispatch(&self, ctx: &mut RequestContext, event: &mut E) -> Result<(), AuthError> {
        for handler in &self.handlers {
            handler.handle(ctx, event).await?;
        }
        Ok(())
    }
}

/// Adapter turning a synchronous closure into an [`EventHandler`].
pub struct FnHandler<E, F> {
    name: &'static str,
    priority: i32,
    f: F,
    _event: PhantomData<fn(&mut E)>,
}

/// Wraps `f` as a handler with the given name and priority.
pub fn handler_fn<E, F>(name: &'static str, priority: i32, f: F) -> Arc<dyn EventHandler<E>>
where
    E: Send + 'static,
    F: Fn(&mut RequestContext, &mut E) -> Result<(), AuthError> + Send + Sync + 'static,
{
    Arc::new(FnHandler {
        name,
        priority,
        f,
        _event: PhantomData,
    })
}

#[async_trait]
impl<E, F> EventHandler<E> for FnHandler<E, F>
where
    E: Send + 'static,
    F: Fn(&mut RequestContext, &mut E) -> Result<(), AuthError> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn handle(&self, ctx: &mut RequestContext, event: &mut E) -> Result<(), AuthError> {
        (self.f)(ctx, event)
    }
}

/// Credentials of the passport in `ctx` must be verified.
#[derive(Debug)]
pub struct CheckPassportEvent {
    /// Authenticator that produced the passport.
    pub authenticator: &'static str,
}

/// A token was minted; handlers may replace it.
#[derive(Debug)]
pub struct TokenCreatedEvent {
    /// Authenticator that produced the passport.
    pub authenticator: &'static str,
    /// The new token.
    pub token: Token,
}

/// Authentication succeeded, before the token is stored.
#[derive(Debug)]
pub struct AuthenticationSuccessEvent {
    /// The authenticated token.
    pub token: Token,
}

/// An interactive authenticator logged the user in.
#[derive(Debug)]
pub struct InteractiveLoginEvent {
    /// The stored token.
    pub token: Token,
}

/// The login completed.
#[derive(Debug)]
pub struct LoginSuccessEvent {
    /// Authenticator that logged the user in.
    pub authenticator: &'static str,
    /// The stored token.
    pub token: Token,
    /// Realm of the firewall.
    pub realm: String,
}

/// The login failed.
#[derive(Debug)]
pub struct LoginFailureEvent {
    /// Authenticator that failed.
    pub authenticator: &'static str,
    /// Why it failed.
    pub error: AuthError,
    /// Realm of the firewall.
    pub realm: String,
}

/// The user is logging out.
#[derive(Debug)]
pub struct LogoutEvent {
    /// Token being discarded.
    pub token: Option<Token>,
}

/// One pipeline per lifecycle point.
#[derive(Debug, Default)]
pub struct EventPipelines {
    /// Verifies passport badges.
    pub check_passport: Pipeline<CheckPassportEvent>,
    /// Observes or replaces freshly minted tokens.
    pub token_created: Pipeline<TokenCreatedEvent>,
    /// Runs once credentials are verified.
    pub authentication_success: Pipeline<AuthenticationSuccessEvent>,
    /// Runs after an interactive login.
    pub interactive_login: Pipeline<InteractiveLoginEvent>,
    /// Runs after every successful login.
    pub login_success: Pipeline<LoginSuccessEvent>,
    /// Runs after every failed login.
    pub login_failure: Pipeline<LoginFailureEvent>,
    /// Runs on logout.
    pub logout: Pipeline<LogoutEvent>,
}

impl EventPipelines {
    /// Creates empty pipelines.
    pub fn new() -> Self {
        Self::default()
    }
}
