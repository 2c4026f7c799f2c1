//! Session fixation protection.

use async_trait::async_trait;

use crate::context::RequestContext;
use crate::event::{EventHandler, LoginSuccessEvent};
use crate::session::SessionStrategy;
use crate::AuthError;

/// Applies the configured [`SessionStrategy`] after a successful login.
#[derive(Debug, Clone, Copy)]
pub struct SessionStrategyListener {
    strategy: SessionStrategy,
}

impl SessionStrategyListener {
    /// Creates the listener.
    pub fn new(strategy: SessionStrategy) -> Self {
        Self { strategy }
    }
}

#[async_trait]
impl EventHandler<LoginSuccessEvent> for SessionStrategyListener {
    fn name(&self) -> &'static str {
        "session_strategy"
    }

    async fn handle(
        &self,
        ctx: &mut RequestContext,
        _event: &mut LoginSuccessEvent,
    ) -> Result<(), AuthError> {
        self.strategy.on_authentication(ctx.session());
        Ok(())
    }
}
