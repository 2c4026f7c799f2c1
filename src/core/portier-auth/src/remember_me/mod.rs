//! Remember-me: establishing a token from a long-lived cookie.
//!
//! [`RememberMeServices`] implements the protocol shared by every strategy:
//! when to read the cookie, how failures cancel it and when a login issues a
//! new one. A [`RememberMeStrategy`] decides what the cookie contains:
//!
//! - [`PersistentTokenStrategy`]: random series and token value backed by a
//!   [`TokenProvider`](portier_storage::TokenProvider), rotated on every use
//!   with theft detection
//! - [`SignatureStrategy`]: stateless HMAC over the user's password hash

pub mod cookie;
pub mod persistent;
pub mod signature;

use std::sync::Arc;

use async_trait::async_trait;
use portier_crypto::SecretKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

pub use cookie::{decode_cookie, encode_cookie, COOKIE_DELIMITER};
pub use persistent::PersistentTokenStrategy;
pub use signature::SignatureStrategy;

use crate::context::RequestContext;
use crate::http::{Body, Cookie, CookieJar, Request, SameSite};
use crate::provider::UserProvider;
use crate::session::auth_username_key;
use crate::token::{Token, TokenUser};
use crate::user::UserRef;
use crate::{unix_now, AuthError};

fn default_name() -> String {
    "REMEMBERME".into()
}

fn default_lifetime() -> u64 {
    31_536_000
}

fn default_path() -> String {
    "/".into()
}

fn default_true() -> bool {
    true
}

fn default_parameter() -> String {
    "_remember_me".into()
}

/// Remember-me cookie options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RememberMeOptions {
    /// Cookie name.
    #[serde(default = "default_name")]
    pub name: String,
    /// Cookie lifetime in seconds.
    #[serde(default = "default_lifetime")]
    pub lifetime: u64,
    /// Cookie path.
    #[serde(default = "default_path")]
    pub path: String,
    /// Cookie domain.
    #[serde(default)]
    pub domain: Option<String>,
    /// Only send the cookie over HTTPS.
    #[serde(default)]
    pub secure: bool,
    /// Hide the cookie from scripts.
    #[serde(default = "default_true")]
    pub http_only: bool,
    /// Cross-site policy.
    #[serde(default)]
    pub same_site: Option<SameSite>,
    /// Issue a cookie on every login, regardless of the request parameter.
    #[serde(default)]
    pub always_remember_me: bool,
    /// Body parameter that opts into remember-me.
    #[serde(default = "default_parameter")]
    pub remember_me_parameter: String,
    /// Accept token values stored before hashing was introduced.
    ///
    /// Deprecated; every accepted legacy value is logged.
    #[serde(default)]
    pub accept_legacy_token_values: bool,
}

impl Default for RememberMeOptions {
    fn default() -> Self {
        Self {
            name: default_name(),
            lifetime: default_lifetime(),
            path: default_path(),
            domain: None,
            secure: false,
            http_only: true,
            same_site: None,
            always_remember_me: false,
            remember_me_parameter: default_parameter(),
            accept_legacy_token_values: false,
        }
    }
}

impl RememberMeOptions {
    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidArgument`] on an empty name or parameter,
    /// or a zero lifetime.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.name.is_empty() {
            return Err(AuthError::InvalidArgument(
                "The remember-me cookie name must not be empty.".into(),
            ));
        }
        if self.lifetime == 0 {
            return Err(AuthError::InvalidArgument(
                "The remember-me lifetime must be positive.".into(),
            ));
        }
        if self.remember_me_parameter.is_empty() {
            return Err(AuthError::InvalidArgument(
                "The remember-me parameter must not be empty.".into(),
            ));
        }
        Ok(())
    }
}

/// What a strategy needs to know about the firewall it serves.
pub struct RememberMeSettings {
    /// Cookie options.
    pub options: RememberMeOptions,
    /// Realm of the firewall.
    pub realm: String,
    /// Server secret for signing and hashing.
    pub secret: SecretKey,
    /// Loads the user named by a cookie.
    pub user_provider: Arc<dyn UserProvider>,
}

impl RememberMeSettings {
    /// Builds the remember-me cookie carrying `value`.
    pub fn cookie(&self, value: String, expires: u64) -> Cookie {
        Cookie {
            name: self.options.name.clone(),
            value: Some(value),
            expires,
            path: self.options.path.clone(),
            domain: self.options.domain.clone(),
            secure: self.options.secure,
            http_only: self.options.http_only,
            same_site: self.options.same_site,
        }
    }
}

/// Cookie format and server-side bookkeeping of one remember-me flavor.
#[async_trait]
pub trait RememberMeStrategy: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Validates decoded cookie parts and returns the user they name.
    ///
    /// May add a replacement cookie to `cookies`.
    async fn process_auto_login_cookie(
        &self,
        parts: &[String],
        settings: &RememberMeSettings,
        cookies: &mut CookieJar,
    ) -> Result<UserRef, AuthError>;

    /// Issues a cookie for `user` after an interactive login.
    async fn on_login_success(
        &self,
        user: &UserRef,
        settings: &RememberMeSettings,
        cookies: &mut CookieJar,
    ) -> Result<(), AuthError>;

    /// Releases server-side state tied to the cookie value `raw`.
    async fn on_cancel(&self, _raw: &str, _settings: &RememberMeSettings) {}
}

/// Remember-me protocol for one firewall.
pub struct RememberMeServices {
    strategy: Arc<dyn RememberMeStrategy>,
    settings: RememberMeSettings,
}

impl RememberMeServices {
    /// Creates the services.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidArgument`] on an empty realm or invalid options.
    pub fn new(
        strategy: Arc<dyn RememberMeStrategy>,
        options: RememberMeOptions,
        realm: impl Into<String>,
        secret: SecretKey,
        user_provider: Arc<dyn UserProvider>,
    ) -> Result<Self, AuthError> {
        let realm = realm.into();
        if realm.is_empty() {
            return Err(AuthError::InvalidArgument(
                "The realm must not be empty.".into(),
            ));
        }
        options.validate()?;

        Ok(Self {
            strategy,
            settings: RememberMeSettings {
                options,
                realm,
                secret,
                user_provider,
            },
        })
    }

    /// Cookie options.
    pub fn options(&self) -> &RememberMeOptions {
        &self.settings.options
    }

    /// Server secret.
    pub fn secret(&self) -> &SecretKey {
        &self.settings.secret
    }

    /// Reads the remember-me cookie and, if valid, stores a remember-me token
    /// in [`RequestContext::remember_me_token`].
    ///
    /// Ordinary failures cancel the cookie and leave the context without a
    /// token.
    ///
    /// # Errors
    ///
    /// [`AuthError::CookieTheft`] and non-authentication errors are returned
    /// after the cookie was cancelled.
    pub async fn auto_login(&self, ctx: &mut RequestContext) -> Result<(), AuthError> {
        let options = &self.settings.options;

        if ctx
            .cookies
            .get(&options.name, &options.path, options.domain.as_deref())
            .is_some_and(Cookie::is_cleared)
        {
            return Ok(());
        }

        let Some(raw) = ctx.request.cookie(&options.name).map(str::to_string) else {
            return Ok(());
        };

        debug!(realm = %self.settings.realm, strategy = self.strategy.name(), "remember-me cookie detected");

        let result = match decode_cookie(&raw) {
            Ok(parts) => {
                self.strategy
                    .process_auto_login_cookie(&parts, &self.settings, &mut ctx.cookies)
                    .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(user) => {
                info!(realm = %self.settings.realm, user = %user.username(), "remember-me cookie accepted");
                ctx.remember_me_token = Some(Token::remember_me(
                    user,
                    self.settings.realm.clone(),
                    self.settings.secret.clone(),
                )?);
                Ok(())
            }
            Err(e @ AuthError::CookieTheft(_)) => {
                warn!(realm = %self.settings.realm, error = %e, "remember-me cookie theft detected");
                self.login_fail(ctx).await;
                Err(e)
            }
            Err(AuthError::UserNotFound { identifier }) => {
                info!(realm = %self.settings.realm, user = %identifier, "user for remember-me cookie not found");
                self.login_fail(ctx).await;
                Ok(())
            }
            Err(e) if e.is_authentication_failure() => {
                match &e {
                    AuthError::TokenNotFound(_) | AuthError::Authentication(_) => {
                        info!(realm = %self.settings.realm, error = %e, "remember-me authentication failed")
                    }
                    _ => debug!(realm = %self.settings.realm, error = %e, "remember-me authentication failed"),
                }
                self.login_fail(ctx).await;
                Ok(())
            }
            Err(e) => {
                self.login_fail(ctx).await;
                Err(e)
            }
        }
    }

    /// Issues a remember-me cookie after an interactive login, if requested.
    pub async fn login_success(
        &self,
        ctx: &mut RequestContext,
        token: &Token,
    ) -> Result<(), AuthError> {
        self.cancel_cookie(ctx).await;

        let Some(TokenUser::Identity(user)) = token.user() else {
            debug!("remember-me ignores a token without a user object");
            return Ok(());
        };

        if !self.is_remember_me_requested(&ctx.request) {
            debug!("remember-me was not requested");
            return Ok(());
        }

        debug!(realm = %self.settings.realm, "remember-me was requested; setting cookie");

        let options = &self.settings.options;
        ctx.cookies
            .remove(&options.name, &options.path, options.domain.as_deref());
        ctx.session()
            .remove(&auth_username_key(&self.settings.realm));

        self.strategy
            .on_login_success(user, &self.settings, &mut ctx.cookies)
            .await
    }

    /// Cancels the cookie after a failed login.
    pub async fn login_fail(&self, ctx: &mut RequestContext) {
        self.cancel_cookie(ctx).await;
    }

    /// Cancels the cookie on logout.
    pub async fn logout(&self, ctx: &mut RequestContext) {
        self.cancel_cookie(ctx).await;
    }

    /// Clears the cookie on the client and releases its server-side state.
    pub async fn cancel_cookie(&self, ctx: &mut RequestContext) {
        let options = &self.settings.options;
        debug!(name = %options.name, "clearing remember-me cookie");

        ctx.cookies
            .forget(&options.name, &options.path, options.domain.as_deref());
        ctx.remember_me_token = None;

        if let Some(raw) = ctx.request.cookie(&options.name) {
            self.strategy.on_cancel(raw, &self.settings).await;
        }
    }

    /// Whether the login request opted into remember-me.
    pub fn is_remember_me_requested(&self, request: &Request) -> bool {
        let options = &self.settings.options;
        if options.always_remember_me {
            return true;
        }

        let parameter = &options.remember_me_parameter;
        if let Body::Json(Value::Object(map)) = request.body() {
            if map.get(parameter) == Some(&Value::Bool(true)) {
                return true;
            }
        }

        match request.body_param(parameter) {
            Some(value) => matches!(value.as_str(), "true" | "on" | "1" | "yes"),
            None => {
                debug!(parameter = %parameter, "did not send remember-me cookie");
                false
            }
        }
    }
}
