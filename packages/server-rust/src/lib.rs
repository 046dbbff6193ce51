//! Keyward server: per-request security context for a certificate authority.
//!
//! Each inbound request gets a [`RequestContext`] that authenticates the
//! caller (password or signed token), resolves the targeted
//! [`CertificateAuthority`], authorizes actions against the caller's registry
//! record, and builds the attribute extension for issued certificates.

pub mod ca;
pub mod config;
pub mod context;
pub mod error;
pub mod network;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod testkit;

pub use ca::{CaComponents, CaServer, CertificateAuthority};
pub use config::{CaConfig, LdapConfig, RegistryConfig, ServerConfig};
pub use context::{BodySource, LimitedBody, RequestContext, REGISTRAR_ROLES_ATTR};
pub use error::{ContextError, ErrorKind};
pub use network::{NetworkConfig, NetworkModule};
pub use telemetry::{init_tracing, LogConfig};
