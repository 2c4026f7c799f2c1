//! JSON body login for APIs.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::form_login::{json_type, MAX_USERNAME_LENGTH};
use super::Authenticator;
use crate::config::JsonLoginOptions;
use crate::context::RequestContext;
use crate::http::{Body, Response};
use crate::passport::{Passport, PasswordCredentials, UserBadge};
use crate::provider::{LoadMethod, UserProvider};
use crate::token::Token;
use crate::AuthError;

/// Authenticates a username and password sent in a JSON body.
///
/// Success lets the request continue; failure answers 401 with a JSON message.
pub struct JsonLoginAuthenticator {
    options: JsonLoginOptions,
    user_provider: Arc<dyn UserProvider>,
    load_method: LoadMethod,
}

impl JsonLoginAuthenticator {
    /// Creates the authenticator.
    pub fn new(
        options: JsonLoginOptions,
        user_provider: Arc<dyn UserProvider>,
        load_method: LoadMethod,
    ) -> Self {
        Self {
            options,
            user_provider,
            load_method,
        }
    }

    /// Follows a dotted path such as `credentials.username`.
    fn lookup<'a>(body: &'a Value, path: &str) -> Option<&'a Value> {
        path.split('.').try_fold(body, |value, key| value.get(key))
    }

    fn string_at(body: &Value, path: &str) -> Result<String, AuthError> {
        match Self::lookup(body, path) {
            Some(Value::String(s)) => Ok(s.clone()),
            other => Err(AuthError::BadRequest(format!(
                "The key \"{path}\" must be a string, \"{}\" given.",
                other.map_or("null", json_type)
            ))),
        }
    }
}

#[async_trait]
impl Authenticator for JsonLoginAuthenticator {
    fn name(&self) -> &'static str {
        "json_login"
    }

    async fn supports(&self, ctx: &mut RequestContext) -> Result<bool, AuthError> {
        let is_json = ctx
            .request
            .header("content-type")
            .is_some_and(|ct| ct.contains("json"));
        if !is_json {
            return Ok(false);
        }

        Ok(match &self.options.check_path {
            Some(check_path) => ctx.request.path().contains(check_path.as_str()),
            None => true,
        })
    }

    async fn authenticate(&self, ctx: &mut RequestContext) -> Result<Passport, AuthError> {
        let Body::Json(body) = ctx.request.body() else {
            return Err(AuthError::BadRequest("Invalid JSON.".into()));
        };

        let username = Self::string_at(body, &self.options.username_path)?;
        if username.chars().count() > MAX_USERNAME_LENGTH {
            return Err(AuthError::BadCredentials("Invalid username.".into()));
        }
        let password = Self::string_at(body, &self.options.password_path)?;

        Ok(Passport::new(
            UserBadge::with_loader(username, Arc::clone(&self.user_provider), self.load_method),
            PasswordCredentials::new(password),
            [],
        ))
    }

    fn create_token(&self, passport: &Passport, realm: &str) -> Result<Token, AuthError> {
        let user = passport.user()?;
        let roles = user.roles().to_vec();
        Token::username_password(user, None, realm, roles)
    }

    async fn on_success(
        &self,
        _ctx: &mut RequestContext,
        _token: &Token,
        _realm: &str,
    ) -> Result<(), AuthError> {
        Ok(())
    }

    async fn on_failure(&self, ctx: &mut RequestContext, error: &AuthError) -> Result<(), AuthError> {
        let mut body = json!({"message": "The request requires valid user authentication."});
        if self.options.debug {
            body["exception"] = json!({
                "message": error.to_string(),
                "key": error.message_key(),
            });
        }

        ctx.response = Some(Response::json(401, &body));
        Ok(())
    }

    fn is_interactive(&self) -> bool {
        true
    }
}
