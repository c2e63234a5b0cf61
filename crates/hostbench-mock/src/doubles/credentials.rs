//! Stored login credentials double.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

/// Login and password remembered for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Login name.
    pub login: String,
    /// Password.
    pub password: String,
}

/// Per-user credential records.
#[derive(Debug, Default)]
pub struct FakeCredentialsStore {
    records: Mutex<BTreeMap<String, Credentials>>,
}

impl FakeCredentialsStore {
    /// Stores credentials for `uid`, replacing earlier ones.
    pub fn store(&self, uid: &str, login: &str, password: &str) {
        self.lock().insert(
            uid.to_owned(),
            Credentials {
                login: login.to_owned(),
                password: password.to_owned(),
            },
        );
    }

    /// Credentials of `uid`.
    #[must_use]
    pub fn get(&self, uid: &str) -> Option<Credentials> {
        self.lock().get(uid).cloned()
    }

    /// Forgets `uid`'s credentials, returning whether any were stored.
    pub fn delete(&self, uid: &str) -> bool {
        self.lock().remove(uid).is_some()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Credentials>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
