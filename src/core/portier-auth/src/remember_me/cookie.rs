//! Remember-me cookie value codec.
//!
//! A cookie value is the base64 encoding of its parts joined by
//! [`COOKIE_DELIMITER`].

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::AuthError;

/// Separator between cookie parts.
pub const COOKIE_DELIMITER: char = ':';

/// Encodes cookie parts.
///
/// # Errors
///
/// Returns [`AuthError::InvalidArgument`] if there are no parts or a part
/// contains the delimiter.
pub fn encode_cookie<S: AsRef<str>>(parts: &[S]) -> Result<String, AuthError> {
    if parts.is_empty() {
        return Err(AuthError::InvalidArgument(
            "A cookie needs at least one part.".into(),
        ));
    }
    if parts.iter().any(|part| part.as_ref().contains(COOKIE_DELIMITER)) {
        return Err(AuthError::InvalidArgument(format!(
            "Cookie parts should not contain the cookie delimiter \"{COOKIE_DELIMITER}\"."
        )));
    }

    let joined = parts
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(":");
    Ok(STANDARD.encode(joined))
}

/// Decodes a cookie value into its parts.
///
/// # Errors
///
/// Returns [`AuthError::CookieTheft`] if the value is not base64 text.
pub fn decode_cookie(raw: &str) -> Result<Vec<String>, AuthError> {
    let bytes = STANDARD.decode(raw).map_err(|_| invalid_cookie())?;
    let text = String::from_utf8(bytes).map_err(|_| invalid_cookie())?;
    Ok(text.split(COOKIE_DELIMITER).map(str::to_string).collect())
}

pub(crate) fn invalid_cookie() -> AuthError {
    AuthError::CookieTheft("The cookie is invalid.".into())
}
