//! Wiring a [`FirewallConfig`] into a ready-to-use [`AuthManager`].

use std::sync::Arc;

use portier_crypto::{Argon2PasswordEncoder, PasswordEncoder, SecretKey};
use portier_storage::TokenProvider;
use tracing::{debug, warn};

use crate::authenticator::{
    Authenticator, FormLoginAuthenticator, HttpBasicAuthenticator, JsonLoginAuthenticator,
    PreAuthenticatedAuthenticator, RememberMeAuthenticator, RemoteUserExtractor,
};
use crate::checker::{DefaultUserChecker, UserChecker};
use crate::config::{FirewallConfig, RememberMeConfig, RememberMeStrategyKind};
use crate::context::RequestContext;
use crate::csrf::CsrfTokenManager;
use crate::event::EventPipelines;
use crate::listener::{
    CheckCredentialsListener, CookieClearingLogoutListener, CsrfProtectionListener,
    CsrfTokenClearingLogoutListener, DefaultLogoutListener, RememberMeFailureListener,
    RememberMeLogoutListener, RememberMeSuccessListener, SessionLogoutListener,
    SessionStrategyListener, UserCheckerPostAuthListener, UserCheckerPreAuthListener,
};
use crate::manager::AuthManager;
use crate::middleware::AuthMiddleware;
use crate::provider::{LoadMethod, UserProvider};
use crate::remember_me::{
    PersistentTokenStrategy, RememberMeServices, RememberMeStrategy, SignatureStrategy,
};
use crate::AuthError;

/// Collects the collaborators a firewall needs and builds it.
pub struct FirewallBuilder {
    config: FirewallConfig,
    user_provider: Option<Arc<dyn UserProvider>>,
    password_encoder: Option<Arc<dyn PasswordEncoder>>,
    user_checker: Option<Arc<dyn UserChecker>>,
    secret: Option<SecretKey>,
    token_provider: Option<Arc<dyn TokenProvider>>,
    csrf_manager: Option<Arc<dyn CsrfTokenManager>>,
}

impl FirewallBuilder {
    /// Starts a builder for `config`.
    pub fn new(config: FirewallConfig) -> Self {
        Self {
            config,
            user_provider: None,
            password_encoder: None,
            user_checker: None,
            secret: None,
            token_provider: None,
            csrf_manager: None,
        }
    }

    /// Source of users. Required.
    pub fn user_provider(mut self, provider: Arc<dyn UserProvider>) -> Self {
        self.user_provider = Some(provider);
        self
    }

    /// Password encoder; Argon2id with default parameters when unset.
    pub fn password_encoder(mut self, encoder: Arc<dyn PasswordEncoder>) -> Self {
        self.password_encoder = Some(encoder);
        self
    }

    /// Account status checks; [`DefaultUserChecker`] when unset.
    pub fn user_checker(mut self, checker: Arc<dyn UserChecker>) -> Self {
        self.user_checker = Some(checker);
        self
    }

    /// Secret keying remember-me tokens and signatures.
    pub fn secret(mut self, secret: SecretKey) -> Self {
        self.secret = Some(secret);
        self
    }

    /// Token store for persistent remember-me.
    pub fn token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.token_provider = Some(provider);
        self
    }

    /// CSRF token manager for form login and logout.
    pub fn csrf_manager(mut self, manager: Arc<dyn CsrfTokenManager>) -> Self {
        self.csrf_manager = Some(manager);
        self
    }

    /// Validates the configuration and builds the firewall.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidArgument`] when the configuration is
    /// invalid or a collaborator it needs is missing.
    pub fn build(self) -> Result<Firewall, AuthError> {
        self.config.validate()?;

        let config = &self.config;
        let realm = config.realm.as_str();
        let user_provider = self.user_provider.clone().ok_or_else(|| {
            AuthError::InvalidArgument("A user provider is required.".into())
        })?;
        let encoder = match &self.password_encoder {
            Some(encoder) => Arc::clone(encoder),
            None => Arc::new(Argon2PasswordEncoder::default()),
        };
        let checker = self
            .user_checker
            .clone()
            .unwrap_or_else(|| Arc::new(DefaultUserChecker));

        let remember_me = match &config.remember_me {
            Some(section) => Some(Arc::new(self.remember_me_services(section, &user_provider)?)),
            None => None,
        };

        let mut events = EventPipelines::new();

        if config.form_login.as_ref().is_some_and(|form| form.enable_csrf) {
            let manager = self.csrf_manager.clone().ok_or_else(|| {
                AuthError::InvalidArgument("CSRF protection requires a CSRF token manager.".into())
            })?;
            events
                .check_passport
                .register(Arc::new(CsrfProtectionListener::new(manager)));
        }
        events
            .check_passport
            .register(Arc::new(UserCheckerPreAuthListener::new(Arc::clone(&checker))));
        events
            .check_passport
            .register(Arc::new(CheckCredentialsListener::new(encoder)));

        events
            .login_success
            .register(Arc::new(UserCheckerPostAuthListener::new(checker)));
        events
            .login_success
            .register(Arc::new(SessionStrategyListener::new(config.session_strategy)));

        if let Some(services) = &remember_me {
            events
                .login_success
                .register(Arc::new(RememberMeSuccessListener::new(Arc::clone(services))));
            events
                .login_failure
                .register(Arc::new(RememberMeFailureListener::new(Arc::clone(services))));
            events
                .logout
                .register(Arc::new(RememberMeLogoutListener::new(Arc::clone(services))));
        }

        if let Some(logout) = &config.logout {
            events
                .logout
                .register(Arc::new(DefaultLogoutListener::new(logout.target.clone())));
            if logout.invalidate_session {
                events.logout.register(Arc::new(SessionLogoutListener));
            }
            if let Some(manager) = &self.csrf_manager {
                events
                    .logout
                    .register(Arc::new(CsrfTokenClearingLogoutListener::new(Arc::clone(manager))));
            }
            if !logout.clear_cookies.is_empty() {
                events
                    .logout
                    .register(Arc::new(CookieClearingLogoutListener::new(logout.clear_cookies.clone())));
            }
        }

        let load_method = config.user_load_method;
        let mut authenticators: Vec<Arc<dyn Authenticator>> = Vec::new();
        if let Some(options) = &config.form_login {
            authenticators.push(Arc::new(FormLoginAuthenticator::new(
                options.clone(),
                Arc::clone(&user_provider),
                load_method,
            )));
        }
        if let Some(options) = &config.json_login {
            authenticators.push(Arc::new(JsonLoginAuthenticator::new(
                options.clone(),
                Arc::clone(&user_provider),
                load_method,
            )));
        }
        if let Some(options) = &config.http_basic {
            authenticators.push(Arc::new(HttpBasicAuthenticator::new(
                options.clone(),
                Arc::clone(&user_provider),
                load_method,
            )));
        }
        if let Some(options) = &config.remote_user {
            authenticators.push(Arc::new(PreAuthenticatedAuthenticator::new(
                RemoteUserExtractor::new(options.clone()),
                realm,
                Arc::clone(&user_provider),
                LoadMethod::Username,
            )));
        }
        if let Some(services) = &remember_me {
            authenticators.push(Arc::new(RememberMeAuthenticator::new(Arc::clone(services))));
        }

        let names: Vec<&'static str> = authenticators.iter().map(|a| a.name()).collect();
        debug!(realm = %realm, authenticators = ?names, "firewall built");

        let manager = AuthManager::new(realm, authenticators, events)?
            .with_erase_credentials(config.erase_credentials);

        Ok(Firewall {
            manager: Arc::new(manager),
            remember_me,
        })
    }

    fn remember_me_services(
        &self,
        section: &RememberMeConfig,
        user_provider: &Arc<dyn UserProvider>,
    ) -> Result<RememberMeServices, AuthError> {
        let strategy: Arc<dyn RememberMeStrategy> = match section.strategy {
            RememberMeStrategyKind::Persistent => {
                let provider = self.token_provider.clone().ok_or_else(|| {
                    AuthError::InvalidArgument(
                        "Persistent remember-me requires a token provider.".into(),
                    )
                })?;
                Arc::new(PersistentTokenStrategy::new(provider))
            }
            RememberMeStrategyKind::Signature => Arc::new(SignatureStrategy),
        };

        let secret = match &self.secret {
            Some(secret) => secret.clone(),
            None => {
                warn!(realm = %self.config.realm, "no remember-me secret configured; cookies will not survive a restart");
                SecretKey::generate()
            }
        };

        RememberMeServices::new(
            strategy,
            section.options.clone(),
            self.config.realm.clone(),
            secret,
            Arc::clone(user_provider),
        )
    }
}

/// A built firewall: the manager plus the services shared with it.
#[derive(Clone)]
pub struct Firewall {
    manager: Arc<AuthManager>,
    remember_me: Option<Arc<RememberMeServices>>,
}

impl Firewall {
    /// The authentication manager.
    pub fn manager(&self) -> &Arc<AuthManager> {
        &self.manager
    }

    /// Remember-me services, when configured.
    pub fn remember_me(&self) -> Option<&Arc<RememberMeServices>> {
        self.remember_me.as_ref()
    }

    /// Middleware guarding handlers with this firewall.
    pub fn middleware(&self) -> AuthMiddleware {
        AuthMiddleware::new(Arc::clone(&self.manager))
    }

    /// Runs the authenticator loop.
    pub async fn authenticate(&self, ctx: &mut RequestContext) -> Result<(), AuthError> {
        self.manager.authenticate(ctx).await
    }

    /// Logs the current user out.
    pub async fn logout(&self, ctx: &mut RequestContext) -> Result<(), AuthError> {
        self.manager.logout(ctx).await
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::config::{FormLoginOptions, HttpBasicOptions, LogoutOptions};
    use crate::csrf::InMemoryCsrfTokenManager;
    use crate::provider::InMemoryUserProvider;
    use portier_storage::InMemoryTokenProvider;

    fn users() -> Arc<dyn UserProvider> {
        Arc::new(InMemoryUserProvider::new())
    }

    #[test]
    fn test_user_provider_required() {
        let result = FirewallBuilder::new(FirewallConfig::new("main")).build();
        assert!(matches!(result, Err(AuthError::InvalidArgument(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = FirewallBuilder::new(FirewallConfig::new(""))
            .user_provider(users())
            .build();
        assert!(matches!(result, Err(AuthError::InvalidArgument(_))));
    }

    #[test]
    fn test_persistent_remember_me_needs_token_provider() {
        let mut config = FirewallConfig::new("main");
        config.remember_me = Some(RememberMeConfig {
            strategy: RememberMeStrategyKind::Persistent,
            options: Default::default(),
        });

        let missing = FirewallBuilder::new(config.clone()).user_provider(users()).build();
        assert!(matches!(missing, Err(AuthError::InvalidArgument(_))));

        let firewall = FirewallBuilder::new(config)
            .user_provider(users())
            .token_provider(Arc::new(InMemoryTokenProvider::new()))
            .secret(SecretKey::generate())
            .build()
            .unwrap();
        assert!(firewall.remember_me().is_some());
    }

    #[test]
    fn test_csrf_needs_manager() {
        let mut config = FirewallConfig::new("main");
        config.form_login = Some(FormLoginOptions {
            enable_csrf: true,
            ..FormLoginOptions::default()
        });

        let missing = FirewallBuilder::new(config.clone()).user_provider(users()).build();
        assert!(matches!(missing, Err(AuthError::InvalidArgument(_))));

        let firewall = FirewallBuilder::new(config)
            .user_provider(users())
            .csrf_manager(Arc::new(InMemoryCsrfTokenManager::new()))
            .build()
            .unwrap();
        assert_eq!(
            firewall.manager().events().check_passport.handler_names(),
            ["csrf_protection", "user_checker_pre_auth", "check_credentials"]
        );
    }

    #[test]
    fn test_listener_registration() {
        let mut config = FirewallConfig::new("main");
        config.http_basic = Some(HttpBasicOptions::default());
        config.remember_me = Some(RememberMeConfig {
            strategy: RememberMeStrategyKind::Signature,
            options: Default::default(),
        });
        config.logout = Some(LogoutOptions::default());

        let firewall = FirewallBuilder::new(config)
            .user_provider(users())
            .build()
            .unwrap();
        let events = firewall.manager().events();

        assert_eq!(
            events.check_passport.handler_names(),
            ["user_checker_pre_auth", "check_credentials"]
        );
        assert_eq!(
            events.login_success.handler_names(),
            ["user_checker_post_auth", "session_strategy", "remember_me_success"]
        );
        assert_eq!(events.login_failure.handler_names(), ["remember_me_failure"]);
        assert_eq!(
            events.logout.handler_names(),
            ["default_logout", "remember_me_logout", "session_logout"]
        );
    }
}
