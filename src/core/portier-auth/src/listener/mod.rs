//! Event listeners shipped with the pipeline.
//!
//! | Listener | Event | Priority |
//! |---|---|---|
//! | [`CsrfProtectionListener`] | check passport | 512 |
//! | [`UserCheckerPreAuthListener`] | check passport | 256 |
//! | [`CheckCredentialsListener`] | check passport | 0 |
//! | [`UserCheckerPostAuthListener`] | login success | 256 |
//! | [`SessionStrategyListener`] | login success | 0 |
//! | [`RememberMeSuccessListener`] | login success | 0 |
//! | [`RememberMeFailureListener`] | login failure | 0 |
//! | [`DefaultLogoutListener`] | logout | 64 |
//! | [`SessionLogoutListener`] | logout | 0 |
//! | [`RememberMeLogoutListener`] | logout | 0 |
//! | [`CsrfTokenClearingLogoutListener`] | logout | 0 |
//! | [`CookieClearingLogoutListener`] | logout | -255 |

mod check_credentials;
mod csrf;
mod logout;
mod remember_me;
mod session;
mod user_checker;

pub use check_credentials::CheckCredentialsListener;
pub use csrf::CsrfProtectionListener;
pub use logout::{
    CookieClearingLogoutListener, CsrfTokenClearingLogoutListener, DefaultLogoutListener,
    RememberMeLogoutListener, SessionLogoutListener,
};
pub use remember_me::{RememberMeFailureListener, RememberMeSuccessListener};
pub use session::SessionStrategyListener;
pub use user_checker::{UserCheckerPostAuthListener, UserCheckerPreAuthListener};
