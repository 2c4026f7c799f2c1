//! CSRF protection for login requests.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::RequestContext;
use crate::csrf::CsrfTokenManager;
use crate::event::{CheckPassportEvent, EventHandler};
use crate::AuthError;

/// Validates the [`CsrfTokenBadge`](crate::passport::CsrfTokenBadge) before
/// any credentials are checked.
pub struct CsrfProtectionListener {
    manager: Arc<dyn CsrfTokenManager>,
}

impl CsrfProtectionListener {
    /// Creates the listener.
    pub fn new(manager: Arc<dyn CsrfTokenManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl EventHandler<CheckPassportEvent> for CsrfProtectionListener {
    fn name(&self) -> &'static str {
        "csrf_protection"
    }

    fn priority(&self) -> i32 {
        512
    }

    async fn handle(
        &self,
        ctx: &mut RequestContext,
        _event: &mut CheckPassportEvent,
    ) -> Result<(), AuthError> {
        let Some(badge) = ctx.passport_mut()?.csrf_token_mut() else {
            return Ok(());
        };
        if badge.is_resolved() {
            return Ok(());
        }

        let valid = badge
            .token()
            .is_some_and(|token| self.manager.is_token_valid(badge.token_id(), token));
        if !valid {
            return Err(AuthError::InvalidCsrfToken);
        }

        badge.mark_resolved();
        Ok(())
    }
}
