//! Identifiers of the host services the provider replaces.

use hostbench_registry::ServiceId;

/// The signed-in user.
pub const USER: ServiceId = ServiceId::from_static("host::CurrentUser");
/// The current HTTP request.
pub const REQUEST: ServiceId = ServiceId::from_static("host::Request");
/// Session storage.
pub const SESSION: ServiceId = ServiceId::from_static("host::Session");
/// Login state.
pub const USER_SESSION: ServiceId = ServiceId::from_static("host::UserSession");
/// Configuration store.
pub const CONFIG_STORE: ServiceId = ServiceId::from_static("host::ConfigStore");
/// Translations.
pub const LOCALISATION: ServiceId = ServiceId::from_static("host::Localisation");
/// Stored login credentials.
pub const CREDENTIALS_STORE: ServiceId = ServiceId::from_static("host::CredentialsStore");

/// Every service overridden when a provider is built, in installation order.
pub const CATALOGUE: [ServiceId; 7] = [
    USER,
    REQUEST,
    SESSION,
    USER_SESSION,
    CONFIG_STORE,
    LOCALISATION,
    CREDENTIALS_STORE,
];
