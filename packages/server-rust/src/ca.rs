//! CA instances and the server-wide CA lookup.
//!
//! A [`CertificateAuthority`] bundles a CA's configuration with the
//! collaborators that back it (registry, certificate store, crypto,
//! revocation, attribute policy, database, signer). [`CaServer`] owns every
//! CA and resolves them by name for request contexts.

use std::sync::Arc;

use dashmap::DashMap;
use keyward_core::{
    AttributeProcessor, CaDatabase, CertificateSigner, CertificateStore, CredentialVerifier,
    RevocationChecker, UserRegistry,
};
use tokio::sync::OnceCell;
use tracing::info;

use crate::config::{CaConfig, ServerConfig};
use crate::error::{ContextError, ErrorKind};

/// Collaborators injected into a [`CertificateAuthority`] at construction.
#[derive(Clone)]
pub struct CaComponents {
    pub registry: Arc<dyn UserRegistry>,
    pub certificates: Arc<dyn CertificateStore>,
    pub verifier: Arc<dyn CredentialVerifier>,
    pub revocation: Arc<dyn RevocationChecker>,
    pub attributes: Arc<dyn AttributeProcessor>,
    pub database: Arc<dyn CaDatabase>,
    pub signer: Arc<dyn CertificateSigner>,
}

/// A named CA shared by all requests that target it.
pub struct CertificateAuthority {
    config: Arc<CaConfig>,
    components: CaComponents,
    /// Set once the database has been initialized successfully.
    db_ready: OnceCell<()>,
}

impl CertificateAuthority {
    #[must_use]
    pub fn new(config: CaConfig, components: CaComponents) -> Self {
        Self {
            config: Arc::new(config),
            components,
            db_ready: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    #[must_use]
    pub fn config(&self) -> &CaConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &dyn UserRegistry {
        self.components.registry.as_ref()
    }

    #[must_use]
    pub fn certificates(&self) -> &dyn CertificateStore {
        self.components.certificates.as_ref()
    }

    #[must_use]
    pub fn verifier(&self) -> &dyn CredentialVerifier {
        self.components.verifier.as_ref()
    }

    #[must_use]
    pub fn revocation(&self) -> &dyn RevocationChecker {
        self.components.revocation.as_ref()
    }

    #[must_use]
    pub fn attributes(&self) -> &dyn AttributeProcessor {
        self.components.attributes.as_ref()
    }

    #[must_use]
    pub fn signer(&self) -> &dyn CertificateSigner {
        self.components.signer.as_ref()
    }

    #[must_use]
    pub fn is_db_initialized(&self) -> bool {
        self.db_ready.initialized()
    }

    /// Initializes the database on first use.
    ///
    /// Concurrent callers wait for the attempt in flight instead of starting
    /// their own. A failed attempt leaves the CA uninitialized so a later
    /// request retries.
    ///
    /// # Errors
    ///
    /// Returns the database's initialization error.
    pub async fn ensure_db_initialized(&self) -> anyhow::Result<()> {
        self.db_ready
            .get_or_try_init(|| async {
                info!(ca = %self.config.name, "initializing CA database");
                self.components.database.initialize().await
            })
            .await?;
        Ok(())
    }
}

/// Server-wide set of CAs, looked up by name.
pub struct CaServer {
    default_ca_name: String,
    cas: DashMap<String, Arc<CertificateAuthority>>,
}

impl CaServer {
    #[must_use]
    pub fn new(default_ca_name: impl Into<String>) -> Self {
        Self {
            default_ca_name: default_ca_name.into(),
            cas: DashMap::new(),
        }
    }

    /// Creates an empty server whose default CA comes from `config`.
    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.default_ca_name.clone())
    }

    /// Name of the CA targeted when a request names none.
    #[must_use]
    pub fn default_ca_name(&self) -> &str {
        &self.default_ca_name
    }

    /// Registers a CA under its configured name, replacing any previous CA
    /// with that name.
    pub fn add_ca(&self, ca: CertificateAuthority) -> Arc<CertificateAuthority> {
        let ca = Arc::new(ca);
        self.cas.insert(ca.name().to_string(), Arc::clone(&ca));
        ca
    }

    /// Looks up a CA by name.
    ///
    /// # Errors
    ///
    /// Returns `CaNotFound` if no CA is registered under `name`.
    pub fn get_ca(&self, name: &str) -> Result<Arc<CertificateAuthority>, ContextError> {
        self.cas
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| {
                ContextError::new(ErrorKind::CaNotFound, format!("CA '{name}' does not exist"))
            })
    }

    /// Names of all registered CAs, sorted.
    #[must_use]
    pub fn ca_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.cas.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }
}
