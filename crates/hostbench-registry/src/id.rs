//! Service identifiers.

use std::borrow::Cow;
use std::fmt;

/// Names a registrable capability.
///
/// Identifiers follow the `module::Name` convention; the first segment names
/// the module that owns the service. Type-derived identifiers use the full
/// Rust type path, so their module is the defining crate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServiceId(Cow<'static, str>);

impl ServiceId {
    /// Identifier from a static name.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Identifier from an owned name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Identifier derived from a Rust type.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(Cow::Borrowed(std::any::type_name::<T>()))
    }

    /// Full identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Module owning the service.
    #[must_use]
    pub fn module(&self) -> &str {
        self.0.split("::").next().unwrap_or_default()
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for ServiceId {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    struct Probe;

    #[rstest]
    #[case("host::Session", "host")]
    #[case("app::mail::Mailer", "app")]
    #[case("bare", "bare")]
    #[case("", "")]
    fn module_is_first_segment(#[case] name: &'static str, #[case] module: &str) {
        assert_eq!(ServiceId::from_static(name).module(), module);
    }

    #[test]
    fn type_ids_belong_to_defining_crate() {
        let id = ServiceId::of::<Probe>();
        assert_eq!(id.module(), "hostbench_registry");
        assert!(id.as_str().ends_with("Probe"));
    }

    #[test]
    fn owned_and_static_ids_compare_equal() {
        assert_eq!(ServiceId::new("host::Request"), ServiceId::from("host::Request"));
    }
}
