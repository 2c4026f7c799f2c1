//! Login form posted to a check path.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::Authenticator;
use crate::config::FormLoginOptions;
use crate::context::RequestContext;
use crate::http::{Body, Request, Response};
use crate::passport::{CsrfTokenBadge, Passport, PasswordCredentials, RememberMeBadge, UserBadge};
use crate::provider::{LoadMethod, UserProvider};
use crate::session::{get_target_path, remove_target_path, LAST_ERROR, LAST_USERNAME};
use crate::token::Token;
use crate::AuthError;

/// Longest username accepted from a login form.
pub(crate) const MAX_USERNAME_LENGTH: usize = 4096;

/// Authenticates a username and password posted by a login form.
///
/// Success redirects to the target path; failure stores the error in the
/// session and redirects back to the form.
pub struct FormLoginAuthenticator {
    options: FormLoginOptions,
    user_provider: Arc<dyn UserProvider>,
    load_method: LoadMethod,
}

impl FormLoginAuthenticator {
    /// Creates the authenticator.
    pub fn new(
        options: FormLoginOptions,
        user_provider: Arc<dyn UserProvider>,
        load_method: LoadMethod,
    ) -> Self {
        Self {
            options,
            user_provider,
            load_method,
        }
    }

    fn form_field(request: &Request, name: &str) -> Result<Option<String>, AuthError> {
        match request.body() {
            Body::Form(fields) => Ok(fields.get(name).cloned()),
            Body::Json(Value::Object(map)) => match map.get(name) {
                None | Some(Value::Null) => Ok(None),
                Some(Value::String(s)) => Ok(Some(s.clone())),
                Some(other) => Err(AuthError::BadRequest(format!(
                    "The key \"{name}\" must be a string, \"{}\" given.",
                    json_type(other)
                ))),
            },
            _ => Ok(None),
        }
    }

    fn target_url(&self, ctx: &RequestContext, realm: &str) -> String {
        let options = &self.options;
        if options.always_use_default_target_path {
            return options.default_target_path.clone();
        }

        if let Some(target) = ctx
            .request
            .body_param(&options.target_path_parameter)
            .filter(|t| !t.is_empty())
        {
            return target;
        }

        if let Some(target) = get_target_path(ctx.session(), realm) {
            remove_target_path(ctx.session(), realm);
            return target;
        }

        if options.use_referer {
            if let Some(referer) = ctx.request.header("referer") {
                let target = referer.split('?').next().unwrap_or_default();
                if !target.is_empty() && target != options.login_path {
                    return target.to_string();
                }
            }
        }

        options.default_target_path.clone()
    }

    fn failure_path(&self, request: &Request) -> String {
        request
            .body_param(&self.options.failure_path_parameter)
            .filter(|p| !p.is_empty())
            .or_else(|| self.options.failure_path.clone())
            .unwrap_or_else(|| self.options.login_path.clone())
    }
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl Authenticator for FormLoginAuthenticator {
    fn name(&self) -> &'static str {
        "form_login"
    }

    async fn supports(&self, ctx: &mut RequestContext) -> Result<bool, AuthError> {
        Ok(ctx.request.method() == "POST" && ctx.request.path() == self.options.check_path)
    }

    async fn authenticate(&self, ctx: &mut RequestContext) -> Result<Passport, AuthError> {
        let options = &self.options;
        let username = Self::form_field(&ctx.request, &options.username_parameter)?.ok_or_else(|| {
            AuthError::BadRequest(format!(
                "The key \"{}\" must be a string, \"null\" given.",
                options.username_parameter
            ))
        })?;
        let username = username.trim().to_string();
        if username.chars().count() > MAX_USERNAME_LENGTH {
            return Err(AuthError::BadCredentials("Invalid username.".into()));
        }

        let password = Self::form_field(&ctx.request, &options.password_parameter)?.unwrap_or_default();
        let csrf_token = Self::form_field(&ctx.request, &options.csrf_parameter)?;

        ctx.session().set(LAST_USERNAME, Value::from(username.as_str()));

        let mut passport = Passport::new(
            UserBadge::with_loader(username, Arc::clone(&self.user_provider), self.load_method),
            PasswordCredentials::new(password),
            [RememberMeBadge.into()],
        );
        if options.enable_csrf {
            passport.add_badge(CsrfTokenBadge::new(options.csrf_token_id.clone(), csrf_token));
        }

        Ok(passport)
    }

    fn create_token(&self, passport: &Passport, realm: &str) -> Result<Token, AuthError> {
        let user = passport.user()?;
        let roles = user.roles().to_vec();
        Token::username_password(user, None, realm, roles)
    }

    async fn on_success(
        &self,
        ctx: &mut RequestContext,
        _token: &Token,
        realm: &str,
    ) -> Result<(), AuthError> {
        let target = self.target_url(ctx, realm);
        ctx.response = Some(Response::redirect(target));
        Ok(())
    }

    async fn on_failure(&self, ctx: &mut RequestContext, error: &AuthError) -> Result<(), AuthError> {
        ctx.session().set(LAST_ERROR, Value::from(error.message_key()));

        let failure_path = self.failure_path(&ctx.request);
        debug!(failure_path = %failure_path, "authentication failure, redirect triggered");
        ctx.response = Some(Response::redirect(failure_path));
        Ok(())
    }

    fn is_interactive(&self) -> bool {
        true
    }
}
