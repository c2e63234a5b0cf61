//! Configuration store double with application, user and system scopes.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Separates the qualifiers of a storage key; it cannot occur in app ids,
/// uids or config keys.
const KEY_SEPARATOR: char = '\u{1f}';

/// Scope a configuration value lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigScope<'a> {
    /// Application-wide value.
    App {
        /// Application id.
        app: &'a str,
    },
    /// Per-user value.
    User {
        /// User id.
        uid: &'a str,
        /// Application id.
        app: &'a str,
    },
    /// System-wide value.
    System,
}

impl ConfigScope<'_> {
    fn prefix(&self) -> String {
        let parts = match *self {
            Self::App { app } => vec!["app", app],
            Self::User { uid, app } => vec!["user", uid, app],
            Self::System => vec!["system"],
        };
        parts.into_iter().fold(String::new(), |mut prefix, part| {
            prefix.push_str(part);
            prefix.push(KEY_SEPARATOR);
            prefix
        })
    }

    fn key(&self, key: &str) -> String {
        let mut qualified = self.prefix();
        qualified.push_str(key);
        qualified
    }
}

/// Supplies environment-specific values for keys the store does not hold.
pub trait ConfigFallback: Send + Sync {
    /// Value for `key` in `scope`, consulted before the caller's default.
    fn lookup(&self, scope: ConfigScope<'_>, key: &str) -> Option<String>;
}

/// Fallback that never supplies a value.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFallback;

impl ConfigFallback for NoFallback {
    fn lookup(&self, _scope: ConfigScope<'_>, _key: &str) -> Option<String> {
        None
    }
}

/// Fallback backed by a fixed table of `(scope, key)` values.
#[derive(Debug, Default, Clone)]
pub struct StaticFallback {
    values: BTreeMap<String, String>,
}

impl StaticFallback {
    /// Adds a value for `key` in `scope`.
    #[must_use]
    pub fn with(mut self, scope: ConfigScope<'_>, key: &str, value: impl Into<String>) -> Self {
        self.values.insert(scope.key(key), value.into());
        self
    }
}

impl ConfigFallback for StaticFallback {
    fn lookup(&self, scope: ConfigScope<'_>, key: &str) -> Option<String> {
        self.values.get(&scope.key(key)).cloned()
    }
}

/// In-memory configuration store.
///
/// A miss consults the [`ConfigFallback`] hook before returning the
/// caller-supplied default; a miss is never an error.
pub struct FakeConfigStore {
    values: Mutex<BTreeMap<String, String>>,
    fallback: Arc<dyn ConfigFallback>,
}

impl Default for FakeConfigStore {
    fn default() -> Self {
        Self::new(Arc::new(NoFallback))
    }
}

impl fmt::Debug for FakeConfigStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeConfigStore")
            .field("values", &*self.lock())
            .finish_non_exhaustive()
    }
}

impl FakeConfigStore {
    /// Empty store consulting `fallback` on misses.
    #[must_use]
    pub fn new(fallback: Arc<dyn ConfigFallback>) -> Self {
        Self {
            values: Mutex::new(BTreeMap::new()),
            fallback,
        }
    }

    /// Value of `key` in `scope`, or the fallback's, or `default`.
    #[must_use]
    pub fn get_value(&self, scope: ConfigScope<'_>, key: &str, default: &str) -> String {
        if let Some(value) = self.lock().get(&scope.key(key)) {
            return value.clone();
        }
        self.fallback
            .lookup(scope, key)
            .unwrap_or_else(|| default.to_owned())
    }

    /// Stores `value` for `key` in `scope`.
    pub fn set_value(&self, scope: ConfigScope<'_>, key: &str, value: impl Into<String>) {
        self.lock().insert(scope.key(key), value.into());
    }

    /// Deletes `key` from `scope`.
    pub fn delete_value(&self, scope: ConfigScope<'_>, key: &str) {
        self.lock().remove(&scope.key(key));
    }

    /// Keys stored in `scope`, sorted.
    #[must_use]
    pub fn keys(&self, scope: ConfigScope<'_>) -> Vec<String> {
        let prefix = scope.prefix();
        self.lock()
            .range(prefix.clone()..)
            .map(|(key, _)| key)
            .take_while(|key| key.starts_with(&prefix))
            .filter_map(|key| key.strip_prefix(&prefix))
            .map(str::to_owned)
            .collect()
    }

    /// Application value.
    #[must_use]
    pub fn get_app_value(&self, app: &str, key: &str, default: &str) -> String {
        self.get_value(ConfigScope::App { app }, key, default)
    }

    /// Stores an application value.
    pub fn set_app_value(&self, app: &str, key: &str, value: impl Into<String>) {
        self.set_value(ConfigScope::App { app }, key, value);
    }

    /// Deletes an application value.
    pub fn delete_app_value(&self, app: &str, key: &str) {
        self.delete_value(ConfigScope::App { app }, key);
    }

    /// Application keys of `app`.
    #[must_use]
    pub fn get_app_keys(&self, app: &str) -> Vec<String> {
        self.keys(ConfigScope::App { app })
    }

    /// Per-user value.
    #[must_use]
    pub fn get_user_value(&self, uid: &str, app: &str, key: &str, default: &str) -> String {
        self.get_value(ConfigScope::User { uid, app }, key, default)
    }

    /// Stores a per-user value.
    pub fn set_user_value(&self, uid: &str, app: &str, key: &str, value: impl Into<String>) {
        self.set_value(ConfigScope::User { uid, app }, key, value);
    }

    /// Deletes a per-user value.
    pub fn delete_user_value(&self, uid: &str, app: &str, key: &str) {
        self.delete_value(ConfigScope::User { uid, app }, key);
    }

    /// Keys stored for `uid` in `app`.
    #[must_use]
    pub fn get_user_keys(&self, uid: &str, app: &str) -> Vec<String> {
        self.keys(ConfigScope::User { uid, app })
    }

    /// System value.
    #[must_use]
    pub fn get_system_value(&self, key: &str, default: &str) -> String {
        self.get_value(ConfigScope::System, key, default)
    }

    /// Stores a system value.
    pub fn set_system_value(&self, key: &str, value: impl Into<String>) {
        self.set_value(ConfigScope::System, key, value);
    }

    /// Deletes a system value.
    pub fn delete_system_value(&self, key: &str) {
        self.delete_value(ConfigScope::System, key);
    }

    /// System keys.
    #[must_use]
    pub fn get_system_keys(&self) -> Vec<String> {
        self.keys(ConfigScope::System)
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
