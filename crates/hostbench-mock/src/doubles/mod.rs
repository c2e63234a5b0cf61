//! Test doubles served by the mock provider.

mod config;
mod credentials;
mod localisation;
mod request;
mod session;
mod user;
mod user_session;

pub use config::{ConfigFallback, ConfigScope, FakeConfigStore, NoFallback, StaticFallback};
pub use credentials::{Credentials, FakeCredentialsStore};
pub use localisation::FakeLocalisation;
pub use request::{FakeRequest, RequestParams};
pub use session::FakeSession;
pub use user::FakeUser;
pub use user_session::FakeUserSession;
