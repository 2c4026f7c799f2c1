//! # Portier Auth
//!
//! Pluggable authentication pipeline for request/response services.
//!
//! ## Building blocks
//!
//! - [`Passport`] and its badges: what must be verified before a login is accepted
//! - [`Token`]: the authenticated identity record
//! - [`Authenticator`]: form login, HTTP basic, JSON login, remote user and remember-me
//! - [`AuthManager`]: tries authenticators in order and drives the event pipelines
//! - [`RememberMeServices`]: persistent login with token rotation and theft detection
//!
//! Everything operates on an abstract [`RequestContext`]; transports are thin
//! adapters around it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod authenticator;
pub mod checker;
pub mod config;
pub mod context;
pub mod csrf;
pub mod error;
pub mod event;
pub mod firewall;
pub mod http;
pub mod listener;
pub mod manager;
pub mod middleware;
pub mod passport;
pub mod provider;
pub mod remember_me;
pub mod session;
pub mod token;
pub mod user;

pub use authenticator::Authenticator;
pub use checker::{DefaultUserChecker, UserChecker};
pub use config::FirewallConfig;
pub use context::RequestContext;
pub use error::AuthError;
pub use event::{EventHandler, EventPipelines, Pipeline};
pub use firewall::{Firewall, FirewallBuilder};
pub use http::{Body, Cookie, CookieJar, Request, Response, SameSite};
pub use manager::AuthManager;
pub use middleware::{AuthMiddleware, RequestHandler};
pub use passport::{Badge, BadgeKind, Passport};
pub use provider::{InMemoryUserProvider, LoadMethod, UserProvider};
pub use remember_me::{RememberMeOptions, RememberMeServices};
pub use session::{MemorySession, Session, SessionStrategy};
pub use token::{Token, TokenKind, TokenStorage, TokenUser};
pub use user::{AccountStatus, User, UserInterface, UserRef};

/// Returns the current Unix timestamp in seconds.
pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
