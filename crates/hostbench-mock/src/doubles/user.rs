//! Signed-in user double.

use serde::{Deserialize, Serialize};

/// Identity of the user a test runs as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FakeUser {
    uid: String,
    display_name: String,
    email: Option<String>,
}

impl FakeUser {
    /// User `uid` whose display name equals the uid and who has no email.
    #[must_use]
    pub fn new(uid: impl Into<String>) -> Self {
        let uid = uid.into();
        Self {
            display_name: uid.clone(),
            uid,
            email: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Sets the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Login identifier.
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Name shown in the interface.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Email address, if any.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}

impl Default for FakeUser {
    fn default() -> Self {
        Self::new("test-user")
            .with_display_name("Test User")
            .with_email("test-user@example.com")
    }
}
