//! Session abstraction and the keys the pipeline stores in it.

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;
use portier_crypto::random::generate_hex_token;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix of the per-realm key holding the authenticated username.
pub const AUTH_USERNAME: &str = "__auth_username.";

/// Last username submitted to a form login.
pub const LAST_USERNAME: &str = "__AUTH_LAST_USERNAME__";

/// Last authentication error shown by a form login page.
pub const LAST_ERROR: &str = "__AUTH_LAST_ERROR__";

/// Key holding the authenticated username for `realm`.
pub fn auth_username_key(realm: &str) -> String {
    format!("{AUTH_USERNAME}{realm}")
}

/// Key holding the URL to return to after logging into `realm`.
pub fn target_path_key(realm: &str) -> String {
    format!("__auth_{realm}_target_path__")
}

/// Remembers where to send the user after logging into `realm`.
pub fn save_target_path(session: &dyn Session, realm: &str, uri: &str) {
    session.set(&target_path_key(realm), Value::from(uri));
}

/// The saved target path for `realm`.
pub fn get_target_path(session: &dyn Session, realm: &str) -> Option<String> {
    session
        .get(&target_path_key(realm))
        .and_then(|v| v.as_str().map(str::to_string))
}

/// Forgets the saved target path for `realm`.
pub fn remove_target_path(session: &dyn Session, realm: &str) {
    session.remove(&target_path_key(realm));
}

/// Server-side session bound to the current client.
///
/// Methods take `&self`; implementations synchronize internally.
pub trait Session: fmt::Debug + Send + Sync {
    /// Session identifier.
    fn id(&self) -> String;

    /// Reads a value.
    fn get(&self, key: &str) -> Option<Value>;

    /// Writes a value.
    fn set(&self, key: &str, value: Value);

    /// Removes a value, returning it.
    fn remove(&self, key: &str) -> Option<Value>;

    /// Whether `key` is set.
    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Issues a new identifier, keeping the data unless `destroy` is set.
    fn migrate(&self, destroy: bool);

    /// Drops all data and issues a new identifier.
    fn invalidate(&self);
}

/// What happens to the session when a login succeeds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStrategy {
    /// Leave the session untouched.
    None,
    /// New identifier, same data.
    #[default]
    Migrate,
    /// New identifier, empty data.
    Invalidate,
}

impl SessionStrategy {
    /// Applies the strategy after a successful login.
    pub fn on_authentication(self, session: &dyn Session) {
        match self {
            Self::None => {}
            Self::Migrate => session.migrate(false),
            Self::Invalidate => session.invalidate(),
        }
    }
}

#[derive(Debug)]
struct SessionState {
    id: String,
    data: HashMap<String, Value>,
}

/// Session held in process memory.
#[derive(Debug)]
pub struct MemorySession {
    state: Mutex<SessionState>,
}

impl MemorySession {
    /// Creates an empty session with a random identifier.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SessionState {
                id: generate_hex_token(16),
                data: HashMap::new(),
            }),
        }
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.state.lock().data.len()
    }

    /// Whether the session holds no values.
    pub fn is_empty(&self) -> bool {
        self.state.lock().data.is_empty()
    }
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::new()
    }
}

impl Session for MemorySession {
    fn id(&self) -> String {
        self.state.lock().id.clone()
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.state.lock().data.get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        self.state.lock().data.insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) -> Option<Value> {
        self.state.lock().data.remove(key)
    }

    fn migrate(&self, destroy: bool) {
        let mut state = self.state.lock();
        state.id = generate_hex_token(16);
        if destroy {
            state.data.clear();
        }
    }

    fn invalidate(&self) {
        self.migrate(true);
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn test_key_helpers() {
        assert_eq!(auth_username_key("main"), "__auth_username.main");
        assert_eq!(target_path_key("main"), "__auth_main_target_path__");
    }

    #[test]
    fn test_set_get_remove() {
        let session = MemorySession::new();
        session.set("a", Value::from(1));

        assert!(session.has("a"));
        assert_eq!(session.get("a"), Some(Value::from(1)));
        assert_eq!(session.remove("a"), Some(Value::from(1)));
        assert!(session.is_empty());
    }

    #[test]
    fn test_migrate_keeps_data_and_changes_id() {
        let session = MemorySession::new();
        session.set("a", Value::from(1));
        let before = session.id();

        SessionStrategy::Migrate.on_authentication(&session);

        assert_ne!(session.id(), before);
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn test_invalidate_drops_data() {
        let session = MemorySession::new();
        session.set("a", Value::from(1));
        let before = session.id();

        SessionStrategy::Invalidate.on_authentication(&session);

        assert_ne!(session.id(), before);
        assert!(session.is_empty());
    }

    #[test]
    fn test_none_strategy_is_noop() {
        let session = MemorySession::new();
        let before = session.id();
        SessionStrategy::None.on_authentication(&session);
        assert_eq!(session.id(), before);
    }

    #[test]
    fn test_target_path_roundtrip() {
        let session = MemorySession::new();
        save_target_path(&session, "main", "/account");
        assert_eq!(get_target_path(&session, "main").as_deref(), Some("/account"));

        remove_target_path(&session, "main");
        assert_eq!(get_target_path(&session, "main"), None);
    }
}
