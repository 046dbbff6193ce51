//! Capabilities the request context consumes from the CA it targets.
//!
//! Every trait here is implemented outside this workspace (registry backends,
//! certificate database, PKI primitives). Implementations are shared across
//! concurrent requests and must be internally thread-safe.

use std::sync::Arc;

use async_trait::async_trait;

use crate::types::{
    Attribute, AttributeRequest, Attributes, Certificate, CertificateRecord, RevocationStatus,
    SignRequest,
};

/// A registered identity as seen by the request context.
///
/// Backends (database, LDAP) are interchangeable behind this trait.
#[async_trait]
pub trait User: Send + Sync {
    /// Enrollment ID of the identity.
    fn name(&self) -> &str;

    /// Identity type (`client`, `peer`, `orderer`, ...).
    fn user_type(&self) -> &str;

    /// Affiliation path segments, root first. Empty for the root affiliation.
    fn affiliation_path(&self) -> Vec<String>;

    /// Looks up a single attribute. Absence is an error.
    fn attribute(&self, name: &str) -> anyhow::Result<Attribute>;

    /// Returns the named attributes, or all of them when `names` is `None`.
    fn attributes(&self, names: Option<&[String]>) -> anyhow::Result<Vec<Attribute>>;

    /// Checks the password and enforces the per-identity enrollment cap.
    ///
    /// `ca_max_enrollments` is the CA-wide cap (`-1` for unlimited).
    async fn login(&self, password: &str, ca_max_enrollments: i32) -> anyhow::Result<()>;
}

/// Identity registry of a CA.
#[async_trait]
pub trait UserRegistry: Send + Sync {
    /// Fetches an identity by enrollment ID.
    async fn get_user(&self, id: &str) -> anyhow::Result<Arc<dyn User>>;
}

/// Issued-certificate records of a CA.
#[async_trait]
pub trait CertificateStore: Send + Sync {
    /// Returns every record matching the serial and authority key identifier
    /// (both lowercase hex, leading zeros stripped).
    async fn get_certificate(
        &self,
        serial: &str,
        aki: &str,
    ) -> anyhow::Result<Vec<CertificateRecord>>;
}

/// Token and chain verification backed by the CA's crypto provider.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Verifies a signed token whose signature covers the token header and
    /// the request body. Returns the signer's certificate.
    async fn verify_token(&self, token: &str, body: &[u8]) -> anyhow::Result<Certificate>;

    /// Fails unless the certificate chains to this CA.
    async fn verify_chain(&self, certificate: &Certificate) -> anyhow::Result<()>;
}

/// CRL and expiry evaluation.
#[async_trait]
pub trait RevocationChecker: Send + Sync {
    async fn check(&self, certificate: &Certificate) -> RevocationStatus;
}

/// Attribute policy: which of the requested attributes go into a certificate.
pub trait AttributeProcessor: Send + Sync {
    /// Resolves `requests` against the identity's `available` attributes.
    /// `Ok(None)` means nothing is to be embedded.
    fn process(
        &self,
        requests: &[AttributeRequest],
        available: &[Attribute],
    ) -> anyhow::Result<Option<Attributes>>;
}

/// The CA's backing database.
#[async_trait]
pub trait CaDatabase: Send + Sync {
    /// One-time initialization (connect, create tables, run migrations).
    /// Must be idempotent.
    async fn initialize(&self) -> anyhow::Result<()>;
}

/// Certificate issuance pipeline.
#[async_trait]
pub trait CertificateSigner: Send + Sync {
    /// Signs the request and returns the PEM-encoded certificate.
    async fn sign(&self, request: SignRequest) -> anyhow::Result<String>;
}
