//! Authentication orchestration.

use std::sync::Arc;

use tracing::{debug, info};

use crate::authenticator::Authenticator;
use crate::context::RequestContext;
use crate::event::{
    AuthenticationSuccessEvent, CheckPassportEvent, EventPipelines, InteractiveLoginEvent,
    LoginFailureEvent, LoginSuccessEvent, LogoutEvent, TokenCreatedEvent,
};
use crate::passport::{Badge, Passport, UserBadge};
use crate::session::auth_username_key;
use crate::token::Token;
use crate::user::UserRef;
use crate::AuthError;

/// Tries each authenticator in order and drives the lifecycle events.
///
/// The first authenticator that supports the request and leaves a response
/// in the context ends the loop. Authentication failures are turned into the
/// authenticator's failure path; any other error is returned to the caller.
pub struct AuthManager {
    realm: String,
    authenticators: Vec<Arc<dyn Authenticator>>,
    events: EventPipelines,
    erase_credentials: bool,
}

impl AuthManager {
    /// Creates a manager for `realm`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidArgument`] if the realm is empty.
    pub fn new(
        realm: impl Into<String>,
        authenticators: Vec<Arc<dyn Authenticator>>,
        events: EventPipelines,
    ) -> Result<Self, AuthError> {
        let realm = realm.into();
        if realm.is_empty() {
            return Err(AuthError::InvalidArgument(
                "The realm must not be empty.".into(),
            ));
        }

        Ok(Self {
            realm,
            authenticators,
            events,
            erase_credentials: true,
        })
    }

    /// Whether credentials are erased from tokens once authenticated.
    pub fn with_erase_credentials(mut self, erase: bool) -> Self {
        self.erase_credentials = erase;
        self
    }

    /// Realm of this manager.
    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Event pipelines.
    pub fn events(&self) -> &EventPipelines {
        &self.events
    }

    /// Runs the authenticator loop for the request in `ctx`.
    ///
    /// On return, `ctx.response` holds the response to send if an
    /// authenticator produced one; otherwise the request continues.
    pub async fn authenticate(&self, ctx: &mut RequestContext) -> Result<(), AuthError> {
        for auth in &self.authenticators {
            if !auth.supports(ctx).await? {
                debug!(realm = %self.realm, authenticator = auth.name(), "authenticator does not support the request");
                continue;
            }

            self.execute(ctx, auth.as_ref()).await?;

            if ctx.response.is_some() {
                debug!(realm = %self.realm, authenticator = auth.name(), "authenticator set the response; later authenticators are not called");
                return Ok(());
            }

            debug!(realm = %self.realm, authenticator = auth.name(), "authenticator set no response; request continues");
        }

        Ok(())
    }

    async fn execute(&self, ctx: &mut RequestContext, auth: &dyn Authenticator) -> Result<(), AuthError> {
        match self.try_authenticate(ctx, auth).await {
            Err(e) if e.is_authentication_failure() => self.handle_failure(ctx, auth, e).await,
            other => other,
        }
    }

    async fn try_authenticate(&self, ctx: &mut RequestContext, auth: &dyn Authenticator) -> Result<(), AuthError> {
        let passport = auth.authenticate(ctx).await?;
        ctx.passport = Some(passport);

        self.events
            .check_passport
            .dispatch(ctx, &mut CheckPassportEvent { authenticator: auth.name() })
            .await?;

        let passport = ctx.passport()?;
        passport.check_if_completely_resolved()?;
        let token = auth.create_token(passport, &self.realm)?;

        let mut created = TokenCreatedEvent {
            authenticator: auth.name(),
            token,
        };
        self.events.token_created.dispatch(ctx, &mut created).await?;

        let mut token = created.token;
        if self.erase_credentials {
            token.erase_credentials();
        }

        let mut success = AuthenticationSuccessEvent { token };
        self.events
            .authentication_success
            .dispatch(ctx, &mut success)
            .await?;

        info!(realm = %self.realm, authenticator = auth.name(), token = %success.token, "authenticator successful");

        self.handle_success(ctx, auth, success.token).await
    }

    async fn handle_success(
        &self,
        ctx: &mut RequestContext,
        auth: &dyn Authenticator,
        token: Token,
    ) -> Result<(), AuthError> {
        ctx.token_storage.set_token(Some(token.clone()));
        ctx.session().set(
            &auth_username_key(&self.realm),
            serde_json::Value::from(token.username()),
        );

        auth.on_success(ctx, &token, &self.realm).await?;

        let token = if auth.is_interactive() {
            let mut event = InteractiveLoginEvent { token };
            self.events.interactive_login.dispatch(ctx, &mut event).await?;
            event.token
        } else {
            token
        };

        let mut event = LoginSuccessEvent {
            authenticator: auth.name(),
            token,
            realm: self.realm.clone(),
        };
        self.events.login_success.dispatch(ctx, &mut event).await
    }

    async fn handle_failure(
        &self,
        ctx: &mut RequestContext,
        auth: &dyn Authenticator,
        error: AuthError,
    ) -> Result<(), AuthError> {
        info!(realm = %self.realm, authenticator = auth.name(), error = %error, "authenticator failed");

        ctx.session().remove(&auth_username_key(&self.realm));
        ctx.token_storage.clear();

        auth.on_failure(ctx, &error).await?;
        if ctx.response.is_some() {
            debug!(realm = %self.realm, authenticator = auth.name(), "authenticator set the failure response");
        }

        let mut event = LoginFailureEvent {
            authenticator: auth.name(),
            error,
            realm: self.realm.clone(),
        };
        self.events.login_failure.dispatch(ctx, &mut event).await
    }

    /// Logs `user` in without checking credentials, e.g. right after
    /// registration.
    ///
    /// The passport is self-validating, so the check-passport phase is
    /// skipped; the token still goes through the token-created event and the
    /// success path of `auth`.
    pub async fn authenticate_user(
        &self,
        ctx: &mut RequestContext,
        auth: &dyn Authenticator,
        user: UserRef,
        badges: Vec<Badge>,
    ) -> Result<(), AuthError> {
        let passport = Passport::self_validating(UserBadge::resolved(user), badges);
        let token = auth.create_token(&passport, &self.realm)?;

        let mut created = TokenCreatedEvent {
            authenticator: auth.name(),
            token,
        };
        self.events.token_created.dispatch(ctx, &mut created).await?;

        ctx.passport = Some(passport);
        self.handle_success(ctx, auth, created.token).await
    }

    /// Logs the current user out.
    ///
    /// Listeners on the logout pipeline clear the token and produce the
    /// response.
    pub async fn logout(&self, ctx: &mut RequestContext) -> Result<(), AuthError> {
        ctx.session().remove(&auth_username_key(&self.realm));

        let mut event = LogoutEvent {
            token: ctx.token_storage.token().cloned(),
        };
        self.events.logout.dispatch(ctx, &mut event).await
    }
}
