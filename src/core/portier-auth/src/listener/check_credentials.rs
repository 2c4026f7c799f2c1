//! Verifies password and custom credentials badges.

use std::sync::Arc;

use async_trait::async_trait;
use portier_crypto::PasswordEncoder;
use tracing::debug;

use crate::context::RequestContext;
use crate::event::{CheckPassportEvent, EventHandler};
use crate::passport::BadgeKind;
use crate::AuthError;

/// Resolves [`PasswordCredentials`](crate::passport::PasswordCredentials)
/// against the stored hash and runs
/// [`CustomCredentials`](crate::passport::CustomCredentials) predicates.
pub struct CheckCredentialsListener {
    encoder: Arc<dyn PasswordEncoder>,
}

impl CheckCredentialsListener {
    /// Creates the listener.
    pub fn new(encoder: Arc<dyn PasswordEncoder>) -> Self {
        Self { encoder }
    }
}

#[async_trait]
impl EventHandler<CheckPassportEvent> for CheckCredentialsListener {
    fn name(&self) -> &'static str {
        "check_credentials"
    }

    async fn handle(
        &self,
        ctx: &mut RequestContext,
        _event: &mut CheckPassportEvent,
    ) -> Result<(), AuthError> {
        let passport = ctx.passport_mut()?;

        if passport.has_badge(BadgeKind::PasswordCredentials) {
            let user = passport.load_user().await?;
            let Some(badge) = passport.password_credentials_mut() else {
                return Ok(());
            };
            if badge.is_resolved() {
                return Ok(());
            }

            let presented = badge.password()?;
            if presented.is_empty() {
                return Err(AuthError::BadCredentials(
                    "The presented password cannot be empty.".into(),
                ));
            }

            let valid = match user.password() {
                Some(stored) => self.encoder.is_valid(stored, presented),
                None => false,
            };
            if !valid {
                debug!(user = %user.username(), "presented password is invalid");
                return Err(AuthError::BadCredentials(
                    "The presented password is invalid.".into(),
                ));
            }

            badge.mark_resolved();
            return Ok(());
        }

        if passport.has_badge(BadgeKind::CustomCredentials) {
            let user = passport.load_user().await?;
            if let Some(badge) = passport.custom_credentials_mut() {
                if !badge.is_resolved() {
                    badge.execute_custom_checker(user.as_ref())?;
                }
            }
        }

        Ok(())
    }
}
