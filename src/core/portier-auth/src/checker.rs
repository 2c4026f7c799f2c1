//! Account status checks around authentication.

use crate::user::UserRef;
use crate::AuthError;

/// Validates account status before and after credentials are checked.
pub trait UserChecker: Send + Sync {
    /// Runs before credentials are checked.
    fn check_pre_auth(&self, user: &UserRef) -> Result<(), AuthError>;

    /// Runs after the login succeeded.
    fn check_post_auth(&self, user: &UserRef) -> Result<(), AuthError>;
}

/// Checks the [`AccountStatus`](crate::AccountStatus) flags.
///
/// Users without account status pass every check.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultUserChecker;

impl UserChecker for DefaultUserChecker {
    fn check_pre_auth(&self, user: &UserRef) -> Result<(), AuthError> {
        let Some(status) = user.account_status() else {
            return Ok(());
        };

        if !status.account_non_locked {
            return Err(AuthError::Locked { user: user.clone() });
        }

        if !status.enabled {
            return Err(AuthError::Disabled { user: user.clone() });
        }

        if !status.account_non_expired {
            return Err(AuthError::AccountExpired { user: user.clone() });
        }

        Ok(())
    }

    fn check_post_auth(&self, user: &UserRef) -> Result<(), AuthError> {
        let Some(status) = user.account_status() else {
            return Ok(());
        };

        if !status.credentials_non_expired {
            return Err(AuthError::CredentialsExpired { user: user.clone() });
        }

        Ok(())
    }
}
