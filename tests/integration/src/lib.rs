//! Integration tests for Portier.
//!
//! These tests drive complete firewalls across crates: login, remember-me
//! rotation against both token stores, theft detection and logout.

// Allow unwrap() in tests - panics are acceptable for test assertions
#![allow(clippy::disallowed_methods)]

use std::sync::{Arc, Once};

use anyhow::Result;
use portier_auth::config::{FirewallConfig, FormLoginOptions, HttpBasicOptions, LogoutOptions};
use portier_auth::config::{RememberMeConfig, RememberMeStrategyKind};
use portier_auth::{
    Firewall, FirewallBuilder, InMemoryUserProvider, MemorySession, Request, RequestContext, User,
};
use portier_crypto::{Argon2PasswordEncoder, PasswordEncoder, SecretKey};
use portier_storage::TokenProvider;

// ============================================================================
// Test Harness
// ============================================================================

/// Name of the remember-me cookie used by the harness.
pub const COOKIE: &str = "REMEMBERME";

static TRACING: Once = Once::new();

/// Installs a subscriber once; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A firewall with its user store, built for one test.
pub struct TestApp {
    pub firewall: Firewall,
    pub users: Arc<InMemoryUserProvider>,
    pub encoder: Arc<Argon2PasswordEncoder>,
}

impl TestApp {
    /// Builds a firewall with form login, HTTP basic, remember-me and logout.
    ///
    /// `token_provider` selects the persistent strategy; `None` selects the
    /// signature strategy.
    pub fn new(token_provider: Option<Arc<dyn TokenProvider>>) -> Result<Self> {
        init_tracing();

        let encoder = Arc::new(Argon2PasswordEncoder::with_cost(8, 1, 1)?);
        let users = Arc::new(InMemoryUserProvider::new());

        let mut config = FirewallConfig::new("main");
        config.form_login = Some(FormLoginOptions::default());
        config.http_basic = Some(HttpBasicOptions::default());
        config.logout = Some(LogoutOptions::default());
        config.remember_me = Some(RememberMeConfig {
            strategy: if token_provider.is_some() {
                RememberMeStrategyKind::Persistent
            } else {
                RememberMeStrategyKind::Signature
            },
            options: Default::default(),
        });

        let mut builder = FirewallBuilder::new(config)
            .user_provider(users.clone())
            .password_encoder(encoder.clone())
            .secret(SecretKey::generate());
        if let Some(provider) = token_provider {
            builder = builder.token_provider(provider);
        }

        let app = Self {
            firewall: builder.build()?,
            users,
            encoder,
        };
        app.set_password("alice", "s3cret")?;
        Ok(app)
    }

    /// Creates or replaces `username` with a fresh hash of `password`.
    pub fn set_password(&self, username: &str, password: &str) -> Result<()> {
        let hash = self.encoder.encode(password)?;
        self.users
            .insert(User::new(username, Some(hash))?.with_roles(["ROLE_USER"]));
        Ok(())
    }

    /// Runs a form login in a fresh session and returns the context.
    pub async fn form_login(&self, password: &str, remember: bool) -> Result<RequestContext> {
        let mut fields = vec![("_username", "alice"), ("_password", password)];
        if remember {
            fields.push(("_remember_me", "on"));
        }
        let request = Request::post("/login_check").with_form(fields);

        let mut ctx = context(request);
        self.firewall.authenticate(&mut ctx).await?;
        Ok(ctx)
    }

    /// Presents a remember-me cookie on a request without a session.
    pub async fn present(&self, cookie: &str) -> Result<RequestContext, portier_auth::AuthError> {
        let mut ctx = context(Request::get("/account").with_cookie(COOKIE, cookie));
        self.firewall.authenticate(&mut ctx).await?;
        Ok(ctx)
    }
}

/// Context for `request` on a new session.
pub fn context(request: Request) -> RequestContext {
    RequestContext::new(request, Arc::new(MemorySession::new()))
}

/// The remember-me cookie set on the response, if any.
pub fn issued_cookie(ctx: &RequestContext) -> Option<String> {
    ctx.cookies
        .get(COOKIE, "/", None)
        .and_then(|cookie| cookie.value.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use async_trait::async_trait;
    use base64::{engine::general_purpose::STANDARD, Engine};
    use portier_auth::authenticator::{Authenticator, HttpBasicAuthenticator};
    use portier_auth::listener::CheckCredentialsListener;
    use portier_auth::config::RemoteUserOptions;
    use portier_auth::passport::Passport;
    use portier_auth::remember_me::decode_cookie;
    use portier_auth::{AuthError, AuthManager, EventPipelines, LoadMethod, Response, TokenKind};
    use portier_auth::{AuthMiddleware, RequestHandler, Token};
    use portier_storage::InMemoryTokenProvider;
    use portier_storage_sqlite::SqliteTokenProvider;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn basic(credentials: &str) -> Request {
        Request::get("/api").with_header(
            "Authorization",
            format!("Basic {}", STANDARD.encode(credentials)),
        )
    }

    /// Form-login stand-in counting calls to `authenticate`.
    struct CountingFormLogin {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Authenticator for CountingFormLogin {
        fn name(&self) -> &'static str {
            "form_login"
        }

        async fn supports(&self, ctx: &mut RequestContext) -> Result<bool, AuthError> {
            Ok(ctx.request.method() == "POST" && ctx.request.path() == "/login_check")
        }

        async fn authenticate(&self, _ctx: &mut RequestContext) -> Result<Passport, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(AuthError::Logic("must not be called".into()))
        }

        async fn on_success(&self, _ctx: &mut RequestContext, _token: &Token, _realm: &str) -> Result<(), AuthError> {
            Ok(())
        }

        async fn on_failure(&self, _ctx: &mut RequestContext, _error: &AuthError) -> Result<(), AuthError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_unsupported_authenticator_never_authenticates() -> Result<()> {
        init_tracing();
        let app = TestApp::new(None)?;
        let calls = Arc::new(AtomicUsize::new(0));
        let mut events = EventPipelines::new();
        events
            .check_passport
            .register(Arc::new(CheckCredentialsListener::new(app.encoder.clone())));
        let authenticators: Vec<Arc<dyn Authenticator>> = vec![
            Arc::new(CountingFormLogin { calls: calls.clone() }),
            Arc::new(HttpBasicAuthenticator::new(
                HttpBasicOptions::default(),
                app.users.clone(),
                LoadMethod::Any,
            )),
        ];
        let manager = AuthManager::new("main", authenticators, events)?;

        let mut ctx = context(basic("alice:s3cret"));
        manager.authenticate(&mut ctx).await?;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        let token = ctx.token_storage.token().context("basic login stores a token")?;
        assert_eq!(token.username(), "alice");
        assert!(ctx.response.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_wrong_password_clears_stored_token() -> Result<()> {
        let app = TestApp::new(None)?;
        let mut ctx = context(basic("alice:wrong")).with_token_storage(
            portier_auth::TokenStorage::with_token(Token::username_password(
                "alice",
                None,
                "main",
                vec![],
            )?),
        );

        app.firewall.authenticate(&mut ctx).await?;

        assert!(ctx.token_storage.token().is_none());
        assert_eq!(ctx.response.as_ref().map(Response::status), Some(401));
        Ok(())
    }

    #[tokio::test]
    async fn test_form_login_redirects_and_remembers_last_username() -> Result<()> {
        let app = TestApp::new(None)?;

        let ok = app.form_login("s3cret", false).await?;
        let response = ok.response.as_ref().context("redirect expected")?;
        assert_eq!(response.status(), 302);
        assert_eq!(response.header("location"), Some("/"));
        assert!(issued_cookie(&ok).is_none());

        let failed = app.form_login("wrong", false).await?;
        assert_eq!(
            failed.response.as_ref().and_then(|r| r.header("location")),
            Some("/login")
        );
        assert_eq!(
            failed.session().get("__AUTH_LAST_USERNAME__"),
            Some(serde_json::json!("alice"))
        );
        assert_eq!(
            failed.session().get("__AUTH_LAST_ERROR__"),
            Some(serde_json::json!("Invalid credentials."))
        );
        Ok(())
    }

    async fn assert_rotation(provider: Arc<dyn TokenProvider>, steps: usize) -> Result<()> {
        let app = TestApp::new(Some(provider.clone()))?;

        let login = app.form_login("s3cret", true).await?;
        let first = issued_cookie(&login).context("remember-me cookie issued")?;

        let mut history = vec![first.clone()];
        let mut current = first;
        for _ in 0..steps {
            let ctx = app.present(&current).await?;
            let token = ctx.token_storage.token().context("remember-me login")?;
            assert!(matches!(token.kind(), TokenKind::RememberMe { .. }));
            assert_eq!(token.username(), "alice");
            assert!(ctx.response.is_none());

            let next = issued_cookie(&ctx).context("rotated cookie issued")?;
            assert_ne!(next, current);
            history.push(next.clone());
            current = next;
        }

        // Rotation keeps one row per lineage: every cookie names the same series.
        let series = decode_cookie(&current)?[0].clone();
        for cookie in &history {
            assert_eq!(decode_cookie(cookie)?[0], series);
        }
        let row = provider.load_token_by_series(&series).await?;
        assert_eq!(row.username(), "alice");
        assert_eq!(provider.delete_tokens_by_username("alice").await?, 1);
        provider.create_new_token(row).await?;

        // Any earlier cookie is a replay.
        let replayed = app.present(&history[0]).await;
        assert!(matches!(replayed, Err(AuthError::CookieTheft(_))));

        // The compromised lineage is gone, so the latest cookie no longer logs in.
        let after = app.present(&current).await?;
        assert!(after.token_storage.token().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_persistent_rotation_in_memory() -> Result<()> {
        assert_rotation(Arc::new(InMemoryTokenProvider::new()), 5).await
    }

    #[tokio::test]
    async fn test_persistent_rotation_sqlite() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let provider = SqliteTokenProvider::open(temp_dir.path(), "remember_me").await?;
        assert_rotation(Arc::new(provider), 5).await
    }

    #[tokio::test]
    async fn test_single_reuse_is_theft() -> Result<()> {
        let provider: Arc<dyn TokenProvider> = Arc::new(InMemoryTokenProvider::new());
        let app = TestApp::new(Some(provider))?;

        let login = app.form_login("s3cret", true).await?;
        let original = issued_cookie(&login).context("cookie")?;

        let rotated = app.present(&original).await?;
        assert!(rotated.token_storage.token().is_some());
        assert!(issued_cookie(&rotated).is_some());

        let replay = app.present(&original).await;
        assert!(matches!(replay, Err(AuthError::CookieTheft(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_signature_cookie_dies_with_password_change() -> Result<()> {
        let app = TestApp::new(None)?;

        let login = app.form_login("s3cret", true).await?;
        let cookie = issued_cookie(&login).context("cookie")?;

        let ctx = app.present(&cookie).await?;
        assert_eq!(ctx.token_storage.token().map(Token::username), Some("alice"));

        app.set_password("alice", "n3w-s3cret")?;
        let stale = app.present(&cookie).await;
        assert!(matches!(stale, Err(AuthError::CookieTheft(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_remember_me_needs_opt_in() -> Result<()> {
        let app = TestApp::new(Some(Arc::new(InMemoryTokenProvider::new())))?;
        let ctx = app.form_login("s3cret", false).await?;
        assert!(issued_cookie(&ctx).is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_logout_revokes_series_and_clears_cookie() -> Result<()> {
        let provider = Arc::new(InMemoryTokenProvider::new());
        let app = TestApp::new(Some(provider.clone()))?;

        let login = app.form_login("s3cret", true).await?;
        let cookie = issued_cookie(&login).context("cookie")?;
        assert_eq!(provider.len(), 1);

        let mut ctx = app.present(&cookie).await?;
        let rotated = issued_cookie(&ctx).context("rotated cookie")?;
        let mut logout = context(Request::get("/logout").with_cookie(COOKIE, rotated.clone()));
        logout.token_storage = std::mem::take(&mut ctx.token_storage);

        app.firewall.logout(&mut logout).await?;

        assert!(logout.token_storage.token().is_none());
        assert_eq!(
            logout.response.as_ref().and_then(|r| r.header("location")),
            Some("/")
        );
        assert!(logout
            .cookies
            .get(COOKIE, "/", None)
            .is_some_and(|c| c.is_cleared()));
        assert!(provider.is_empty());

        let after = app.present(&rotated).await?;
        assert!(after.token_storage.token().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_firewall_from_json_config() -> Result<()> {
        init_tracing();
        let config: FirewallConfig = serde_json::from_value(serde_json::json!({
            "realm": "api",
            "session_strategy": "none",
            "json_login": {"check_path": "/api/login"},
            "remember_me": {"strategy": "signature", "name": "KEEP", "lifetime": 3600},
        }))?;

        let encoder = Arc::new(Argon2PasswordEncoder::with_cost(8, 1, 1)?);
        let users = Arc::new(InMemoryUserProvider::with_users([User::new(
            "bob",
            Some(encoder.encode("pw")?),
        )?]));
        let firewall = FirewallBuilder::new(config)
            .user_provider(users)
            .password_encoder(encoder)
            .build()?;

        let mut ctx = context(
            Request::post("/api/login").with_json(serde_json::json!({"username": "bob", "password": "pw"})),
        );
        firewall.authenticate(&mut ctx).await?;
        assert_eq!(ctx.token_storage.token().map(Token::username), Some("bob"));
        assert!(ctx.response.is_none());

        let mut bad = context(
            Request::post("/api/login").with_json(serde_json::json!({"username": "bob", "password": "nope"})),
        );
        firewall.authenticate(&mut bad).await?;
        assert_eq!(bad.response.as_ref().map(Response::status), Some(401));
        Ok(())
    }

    fn remote_user_firewall(users: Vec<User>) -> Result<Firewall> {
        init_tracing();
        let mut config = FirewallConfig::new("main");
        config.remote_user = Some(RemoteUserOptions::default());

        Ok(FirewallBuilder::new(config)
            .user_provider(Arc::new(InMemoryUserProvider::with_users(users)))
            .build()?)
    }

    #[tokio::test]
    async fn test_remote_user_known_user_logs_in() -> Result<()> {
        let firewall = remote_user_firewall(vec![User::new("alice", None)?.with_roles(["ROLE_USER"])])?;

        let mut ctx = context(Request::get("/").with_server_param("REMOTE_USER", "alice"));
        firewall.authenticate(&mut ctx).await?;

        let token = ctx.token_storage.token().context("remote user token stored")?;
        assert!(matches!(token.kind(), TokenKind::PreAuthenticated { .. }));
        assert_eq!(token.username(), "alice");
        assert_eq!(token.roles(), ["ROLE_USER".to_string()]);
        assert!(ctx.response.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_remote_user_unknown_user_takes_failure_path() -> Result<()> {
        let firewall = remote_user_firewall(vec![User::new("alice", None)?])?;

        let stale = Token::pre_authenticated("alice", None, "main", vec!["ROLE_USER".into()])?;
        let mut ctx = context(Request::get("/").with_server_param("REMOTE_USER", "ghost"))
            .with_token_storage(portier_auth::TokenStorage::with_token(stale));
        firewall.authenticate(&mut ctx).await?;

        assert!(ctx.token_storage.token().is_none());
        assert!(ctx.response.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_remote_user_absent_is_skipped() -> Result<()> {
        let firewall = remote_user_firewall(vec![User::new("alice", None)?])?;

        let mut ctx = context(Request::get("/"));
        firewall.authenticate(&mut ctx).await?;

        assert!(ctx.token_storage.token().is_none());
        assert!(ctx.response.is_none());
        Ok(())
    }

    struct Echo;

    #[async_trait]
    impl RequestHandler for Echo {
        async fn handle(&self, ctx: &mut RequestContext) -> Result<Response, AuthError> {
            let who = ctx.token_storage.token().map_or("anonymous", Token::username).to_string();
            Ok(Response::new(200).with_body(who))
        }
    }

    #[tokio::test]
    async fn test_middleware_guards_handler() -> Result<()> {
        let app = TestApp::new(None)?;
        let middleware: AuthMiddleware = app.firewall.middleware();

        let mut ok = context(basic("alice:s3cret"));
        let response = middleware.process(&mut ok, &Echo).await?;
        assert_eq!(response.body(), Some("alice"));

        let mut denied = context(basic("alice:wrong"));
        let response = middleware.process(&mut denied, &Echo).await?;
        assert_eq!(response.status(), 401);

        let mut login = context(Request::post("/login_check").with_form([
            ("_username", "alice"),
            ("_password", "s3cret"),
        ]));
        let response = middleware.process(&mut login, &Echo).await?;
        assert_eq!(response.status(), 302);
        Ok(())
    }
}
