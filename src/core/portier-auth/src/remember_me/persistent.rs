//! Remember-me backed by a persistent token store.
//!
//! The cookie carries a series and a token value. The store keeps the
//! series with a keyed hash of the token value. Every accepted cookie
//! rotates the token value, so a replayed cookie presents a stale value,
//! which is reported as [`AuthError::CookieTheft`].
//!
//! Two requests racing on the same series can both present the value that
//! was current when they were sent; the loser then reports theft. No grace
//! window is applied.

use std::sync::Arc;

use async_trait::async_trait;
use portier_crypto::mac::{constant_time_eq, sign_hex};
use portier_crypto::random::{generate_token, TOKEN_BYTES};
use portier_crypto::SecretKey;
use portier_storage::{PersistentToken, StorageError, TokenProvider};
use tracing::{debug, warn};

use super::cookie::{encode_cookie, invalid_cookie};
use super::{RememberMeSettings, RememberMeStrategy};
use crate::http::CookieJar;
use crate::user::UserRef;
use crate::{unix_now, AuthError};

/// Prefix marking a stored token value as hashed.
pub const HASHED_TOKEN_PREFIX: &str = "sha256_";

/// Persistent-token remember-me strategy.
pub struct PersistentTokenStrategy {
    provider: Arc<dyn TokenProvider>,
}

impl PersistentTokenStrategy {
    /// Creates the strategy on top of `provider`.
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self { provider }
    }

    /// The token store.
    pub fn provider(&self) -> &Arc<dyn TokenProvider> {
        &self.provider
    }

    fn issue(
        &self,
        series: &str,
        token_value: &str,
        settings: &RememberMeSettings,
        cookies: &mut CookieJar,
    ) -> Result<(), AuthError> {
        let value = encode_cookie(&[series, token_value])?;
        let expires = unix_now().saturating_add(settings.options.lifetime);
        cookies.add(settings.cookie(value, expires));
        Ok(())
    }
}

/// Keyed hash of a token value as stored by [`PersistentTokenStrategy`].
pub fn hash_token_value(secret: &SecretKey, token_value: &str) -> Result<String, AuthError> {
    Ok(format!(
        "{HASHED_TOKEN_PREFIX}{}",
        sign_hex(secret, token_value.as_bytes())?
    ))
}

fn is_token_value_valid(
    stored: &PersistentToken,
    presented: &str,
    settings: &RememberMeSettings,
) -> Result<bool, AuthError> {
    let stored_value = stored.token_value();

    if stored_value.starts_with(HASHED_TOKEN_PREFIX) {
        let expected = hash_token_value(&settings.secret, presented)?;
        return Ok(constant_time_eq(stored_value.as_bytes(), expected.as_bytes()));
    }

    if !settings.options.accept_legacy_token_values {
        return Err(AuthError::Authentication(
            "The stored remember-me token uses an unsupported format.".into(),
        ));
    }

    warn!(
        series = %stored.series(),
        "accepting an unhashed remember-me token value; this format is deprecated"
    );
    Ok(constant_time_eq(stored_value.as_bytes(), presented.as_bytes()))
}

#[async_trait]
impl RememberMeStrategy for PersistentTokenStrategy {
    fn name(&self) -> &'static str {
        "persistent"
    }

    async fn process_auto_login_cookie(
        &self,
        parts: &[String],
        settings: &RememberMeSettings,
        cookies: &mut CookieJar,
    ) -> Result<UserRef, AuthError> {
        let [series, token_value] = parts else {
            return Err(invalid_cookie());
        };

        let stored = self.provider.load_token_by_series(series).await?;

        if !is_token_value_valid(&stored, token_value, settings)? {
            warn!(
                realm = %settings.realm,
                user = %stored.username(),
                "remember-me token value mismatch for a known series"
            );
            return Err(AuthError::CookieTheft(
                "This token was already used. The account is possibly compromised.".into(),
            ));
        }

        let now = unix_now();
        if stored.last_used().saturating_add(settings.options.lifetime) < now {
            return Err(AuthError::Authentication("The cookie has expired.".into()));
        }

        let fresh = generate_token(TOKEN_BYTES);
        self.provider
            .update_token(series, &hash_token_value(&settings.secret, &fresh)?, now)
            .await?;
        self.issue(series, &fresh, settings, cookies)?;

        settings
            .user_provider
            .load_by_username(stored.username())
            .await
    }

    async fn on_login_success(
        &self,
        user: &UserRef,
        settings: &RememberMeSettings,
        cookies: &mut CookieJar,
    ) -> Result<(), AuthError> {
        let series = generate_token(TOKEN_BYTES);
        let token_value = generate_token(TOKEN_BYTES);

        let token = PersistentToken::new(
            user.class_name(),
            user.username(),
            &series,
            hash_token_value(&settings.secret, &token_value)?,
            unix_now(),
        )?;
        self.provider.create_new_token(token).await?;

        self.issue(&series, &token_value, settings, cookies)
    }

    async fn on_cancel(&self, raw: &str, _settings: &RememberMeSettings) {
        let Ok(parts) = super::decode_cookie(raw) else {
            return;
        };
        let [series, _] = parts.as_slice() else {
            return;
        };

        match self.provider.delete_token_by_series(series).await {
            Ok(()) => debug!("remember-me series deleted"),
            Err(StorageError::NotFound(_)) => debug!("remember-me series already gone"),
            Err(e) => warn!(error = %e, "failed to delete remember-me series"),
        }
    }
}
