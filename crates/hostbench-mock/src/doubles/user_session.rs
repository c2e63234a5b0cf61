//! Login state double.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::session::FakeSession;
use super::user::FakeUser;

/// Login state of the test user over its session.
#[derive(Debug)]
pub struct FakeUserSession {
    user: Arc<FakeUser>,
    session: Arc<FakeSession>,
    logged_in: AtomicBool,
}

impl FakeUserSession {
    /// User session for `user`, logged in.
    #[must_use]
    pub fn new(user: Arc<FakeUser>, session: Arc<FakeSession>) -> Self {
        Self {
            user,
            session,
            logged_in: AtomicBool::new(true),
        }
    }

    /// Returns `true` while the user is logged in.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }

    /// Logged-in user.
    #[must_use]
    pub fn user(&self) -> Option<Arc<FakeUser>> {
        self.is_logged_in().then(|| Arc::clone(&self.user))
    }

    /// Login name of the logged-in user.
    #[must_use]
    pub fn login_name(&self) -> Option<&str> {
        self.is_logged_in().then(|| self.user.uid())
    }

    /// Session backing the login.
    #[must_use]
    pub fn session(&self) -> &Arc<FakeSession> {
        &self.session
    }

    /// Logs the user back in.
    pub fn login(&self) {
        self.logged_in.store(true, Ordering::SeqCst);
    }

    /// Logs the user out and clears the session.
    pub fn logout(&self) {
        self.logged_in.store(false, Ordering::SeqCst);
        self.session.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logout_hides_user_and_clears_session() {
        let session = Arc::new(FakeSession::default());
        session.set("user_id", "test-user");
        let user_session = FakeUserSession::new(Arc::new(FakeUser::default()), Arc::clone(&session));
        assert_eq!(user_session.login_name(), Some("test-user"));

        user_session.logout();
        assert!(user_session.user().is_none());
        assert!(!session.contains("user_id"));

        user_session.login();
        assert!(user_session.is_logged_in());
    }
}
