//! Test doubles for host services, installed through the registry override
//! engine.
//!
//! [`MockProvider`] is the per-case composition root. Building one rolls the
//! host's registries back to the suite baseline held by a
//! [`HarnessContext`](hostbench_registry::HarnessContext), then overrides
//! every service in [`catalogue::CATALOGUE`] so both test code and
//! application code see the same lazily built doubles:
//!
//! ```ignore
//! let provider = MockProvider::builder(context, registries)
//!     .with_user(FakeUser::new("alice"))
//!     .build()?;
//! let config = provider.get_cloud_config();
//! config.set_user_value("alice", "files", "quota", "5 GB");
//! ```

pub mod catalogue;
mod doubles;
mod provider;

/// Target used for provider diagnostics.
pub(crate) const PROVIDER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::provider");

pub use doubles::{
    ConfigFallback, ConfigScope, Credentials, FakeConfigStore, FakeCredentialsStore,
    FakeLocalisation, FakeRequest, FakeSession, FakeUser, FakeUserSession, NoFallback,
    RequestParams, StaticFallback,
};
pub use provider::{DEFAULT_PASSWORD, MockProvider, MockProviderBuilder};

#[cfg(test)]
mod tests;
