//! Firewall configuration.
//!
//! Every section deserializes from JSON (or any serde format) with defaults
//! for omitted fields:
//!
//! ```json
//! {
//!   "realm": "main",
//!   "form_login": { "check_path": "/login_check", "enable_csrf": true },
//!   "remember_me": { "strategy": "persistent", "lifetime": 604800 },
//!   "logout": { "target": "/" }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::provider::LoadMethod;
use crate::remember_me::RememberMeOptions;
use crate::session::SessionStrategy;
use crate::AuthError;

fn default_true() -> bool {
    true
}

fn s(value: &str) -> String {
    value.to_string()
}

fn require(field: &str, value: &str) -> Result<(), AuthError> {
    if value.is_empty() {
        return Err(AuthError::InvalidArgument(format!(
            "The option \"{field}\" must not be empty."
        )));
    }
    Ok(())
}

/// Form login options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormLoginOptions {
    /// Path the login form posts to.
    pub check_path: String,
    /// Path of the login form.
    pub login_path: String,
    /// Form field holding the username.
    pub username_parameter: String,
    /// Form field holding the password.
    pub password_parameter: String,
    /// Where to redirect after a failure; defaults to the login path.
    pub failure_path: Option<String>,
    /// Form field overriding the failure path.
    pub failure_path_parameter: String,
    /// Require a CSRF token.
    pub enable_csrf: bool,
    /// Form field holding the CSRF token.
    pub csrf_parameter: String,
    /// Identifier the CSRF token was generated for.
    pub csrf_token_id: String,
    /// Where to redirect after a login when nothing else applies.
    pub default_target_path: String,
    /// Form field overriding the target path.
    pub target_path_parameter: String,
    /// Always redirect to the default target path.
    pub always_use_default_target_path: bool,
    /// Fall back to the `Referer` header.
    pub use_referer: bool,
}

impl Default for FormLoginOptions {
    fn default() -> Self {
        Self {
            check_path: s("/login_check"),
            login_path: s("/login"),
            username_parameter: s("_username"),
            password_parameter: s("_password"),
            failure_path: None,
            failure_path_parameter: s("_failure_path"),
            enable_csrf: false,
            csrf_parameter: s("_csrf_token"),
            csrf_token_id: s("authenticate"),
            default_target_path: s("/"),
            target_path_parameter: s("_target_path"),
            always_use_default_target_path: false,
            use_referer: false,
        }
    }
}

impl FormLoginOptions {
    /// Validates the options.
    pub fn validate(&self) -> Result<(), AuthError> {
        require("check_path", &self.check_path)?;
        require("login_path", &self.login_path)?;
        require("username_parameter", &self.username_parameter)?;
        require("password_parameter", &self.password_parameter)?;
        require("default_target_path", &self.default_target_path)?;
        if self.enable_csrf {
            require("csrf_parameter", &self.csrf_parameter)?;
            require("csrf_token_id", &self.csrf_token_id)?;
        }
        Ok(())
    }
}

/// JSON login options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonLoginOptions {
    /// Only handle requests whose path contains this value.
    pub check_path: Option<String>,
    /// Dotted path of the username in the body.
    pub username_path: String,
    /// Dotted path of the password in the body.
    pub password_path: String,
    /// Include error details in failure responses.
    pub debug: bool,
}

impl Default for JsonLoginOptions {
    fn default() -> Self {
        Self {
            check_path: None,
            username_path: s("username"),
            password_path: s("password"),
            debug: false,
        }
    }
}

impl JsonLoginOptions {
    /// Validates the options.
    pub fn validate(&self) -> Result<(), AuthError> {
        require("username_path", &self.username_path)?;
        require("password_path", &self.password_path)
    }
}

/// HTTP basic options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpBasicOptions {
    /// Realm announced in `WWW-Authenticate`.
    pub realm_name: String,
}

impl Default for HttpBasicOptions {
    fn default() -> Self {
        Self {
            realm_name: s("Secured Area"),
        }
    }
}

/// Remote user options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteUserOptions {
    /// Server parameter or request attribute holding the username.
    pub user_key: String,
}

impl Default for RemoteUserOptions {
    fn default() -> Self {
        Self {
            user_key: s("REMOTE_USER"),
        }
    }
}

/// Cookie cleared on logout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearCookie {
    /// Cookie name.
    pub name: String,
    /// Cookie path.
    #[serde(default = "root_path")]
    pub path: String,
    /// Cookie domain.
    #[serde(default)]
    pub domain: Option<String>,
}

fn root_path() -> String {
    s("/")
}

/// Logout options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogoutOptions {
    /// Where to redirect after logging out.
    pub target: String,
    /// Invalidate the session.
    pub invalidate_session: bool,
    /// Cookies to clear.
    pub clear_cookies: Vec<ClearCookie>,
}

impl Default for LogoutOptions {
    fn default() -> Self {
        Self {
            target: s("/"),
            invalidate_session: true,
            clear_cookies: Vec::new(),
        }
    }
}

/// Remember-me cookie flavor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RememberMeStrategyKind {
    /// Series and rotating token value kept in a token store.
    #[default]
    Persistent,
    /// Stateless HMAC signature.
    Signature,
}

/// Remember-me section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RememberMeConfig {
    /// Cookie flavor.
    #[serde(default)]
    pub strategy: RememberMeStrategyKind,
    /// Cookie options.
    #[serde(flatten)]
    pub options: RememberMeOptions,
}

/// One firewall: a realm and the authenticators protecting it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallConfig {
    /// Realm name.
    pub realm: String,
    /// Erase credentials from tokens once authenticated.
    #[serde(default = "default_true")]
    pub erase_credentials: bool,
    /// What happens to the session on login.
    #[serde(default)]
    pub session_strategy: SessionStrategy,
    /// How password-based authenticators look users up.
    #[serde(default)]
    pub user_load_method: LoadMethod,
    /// Form login.
    #[serde(default)]
    pub form_login: Option<FormLoginOptions>,
    /// JSON login.
    #[serde(default)]
    pub json_login: Option<JsonLoginOptions>,
    /// HTTP basic.
    #[serde(default)]
    pub http_basic: Option<HttpBasicOptions>,
    /// Remote user.
    #[serde(default)]
    pub remote_user: Option<RemoteUserOptions>,
    /// Remember-me.
    #[serde(default)]
    pub remember_me: Option<RememberMeConfig>,
    /// Logout.
    #[serde(default)]
    pub logout: Option<LogoutOptions>,
}

impl FirewallConfig {
    /// Creates a configuration with no authenticator enabled.
    pub fn new(realm: impl Into<String>) -> Self {
        Self {
            realm: realm.into(),
            erase_credentials: true,
            session_strategy: SessionStrategy::default(),
            user_load_method: LoadMethod::default(),
            form_login: None,
            json_login: None,
            http_basic: None,
            remote_user: None,
            remember_me: None,
            logout: None,
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidArgument`] naming the first invalid option.
    pub fn validate(&self) -> Result<(), AuthError> {
        require("realm", &self.realm)?;
        if let Some(form) = &self.form_login {
            form.validate()?;
        }
        if let Some(json) = &self.json_login {
            json.validate()?;
        }
        if let Some(basic) = &self.http_basic {
            require("realm_name", &basic.realm_name)?;
        }
        if let Some(remote) = &self.remote_user {
            require("user_key", &remote.user_key)?;
        }
        if let Some(remember_me) = &self.remember_me {
            remember_me.options.validate()?;
        }
        if let Some(logout) = &self.logout {
            require("target", &logout.target)?;
        }
        Ok(())
    }
}
