//! Stateless remember-me signed with the server secret.
//!
//! The cookie carries the user class, the base64 username, an expiry and an
//! HMAC over those values and the user's current password hash. Changing the
//! password invalidates every outstanding cookie. Nothing is stored server
//! side, so there is no rotation and no theft detection.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use portier_crypto::mac::{constant_time_eq, sign_hex};
use portier_crypto::SecretKey;

use super::cookie::{encode_cookie, invalid_cookie};
use super::{RememberMeSettings, RememberMeStrategy};
use crate::http::CookieJar;
use crate::user::UserRef;
use crate::{unix_now, AuthError};

/// Signed-cookie remember-me strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureStrategy;

fn cookie_hash(
    secret: &SecretKey,
    class: &str,
    username: &str,
    expires: u64,
    password: Option<&str>,
) -> Result<String, AuthError> {
    let data = format!("{class}:{username}:{expires}:{}", password.unwrap_or_default());
    Ok(sign_hex(secret, data.as_bytes())?)
}

/// Builds a signed cookie value.
///
/// # Errors
///
/// Returns [`AuthError::InvalidArgument`] if `class` contains the cookie
/// delimiter.
pub fn generate_cookie_value(
    secret: &SecretKey,
    class: &str,
    username: &str,
    expires: u64,
    password: Option<&str>,
) -> Result<String, AuthError> {
    let hash = cookie_hash(secret, class, username, expires, password)?;
    encode_cookie(&[
        class.to_string(),
        STANDARD.encode(username),
        expires.to_string(),
        hash,
    ])
}

#[async_trait]
impl RememberMeStrategy for SignatureStrategy {
    fn name(&self) -> &'static str {
        "signature"
    }

    async fn process_auto_login_cookie(
        &self,
        parts: &[String],
        settings: &RememberMeSettings,
        _cookies: &mut CookieJar,
    ) -> Result<UserRef, AuthError> {
        let [class, encoded_username, expires, hash] = parts else {
            return Err(invalid_cookie());
        };

        let expires: u64 = expires.parse().map_err(|_| invalid_cookie())?;
        let username = STANDARD
            .decode(encoded_username)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or_else(|| {
                AuthError::CookieTheft(
                    "The username contains a character from outside the base64 alphabet.".into(),
                )
            })?;

        let user = match settings.user_provider.load_by_username(&username).await {
            Ok(user) => user,
            Err(e) if e.is_authentication_failure() => return Err(e),
            Err(_) => return Err(AuthError::UserNotFound { identifier: username }),
        };

        let expected = cookie_hash(&settings.secret, class, &username, expires, user.password())?;
        if !constant_time_eq(expected.as_bytes(), hash.as_bytes()) {
            return Err(AuthError::CookieTheft("The cookie's hash is invalid.".into()));
        }

        if expires < unix_now() {
            return Err(AuthError::Authentication("The cookie has expired.".into()));
        }

        Ok(user)
    }

    async fn on_login_success(
        &self,
        user: &UserRef,
        settings: &RememberMeSettings,
        cookies: &mut CookieJar,
    ) -> Result<(), AuthError> {
        let expires = unix_now().saturating_add(settings.options.lifetime);
        let value = generate_cookie_value(
            &settings.secret,
            user.class_name(),
            user.username(),
            expires,
            user.password(),
        )?;
        cookies.add(settings.cookie(value, expires));
        Ok(())
    }
}
