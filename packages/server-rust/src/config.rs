//! Server and per-CA configuration.
//!
//! Values are resolved once at startup and shared read-only via `Arc`.

use crate::network::NetworkConfig;
use crate::telemetry::LogConfig;

/// Server-level configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// CA targeted by requests that name none, via query or body.
    pub default_ca_name: String,
    pub network: NetworkConfig,
    pub log: LogConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            default_ca_name: "ca".to_string(),
            network: NetworkConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// Configuration of a single CA instance.
#[derive(Debug, Clone)]
pub struct CaConfig {
    /// Name requests use to target this CA.
    pub name: String,
    pub registry: RegistryConfig,
    pub ldap: LdapConfig,
}

impl CaConfig {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registry: RegistryConfig::default(),
            ldap: LdapConfig::default(),
        }
    }
}

/// Identity registry settings.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Maximum enrollments per identity. `0` disables password-based
    /// enrollment, `-1` means unlimited.
    pub max_enrollments: i32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_enrollments: -1,
        }
    }
}

/// LDAP-backed registry settings.
#[derive(Debug, Clone, Default)]
pub struct LdapConfig {
    pub enabled: bool,
}
