//! In-memory collaborators and request fixtures for unit tests.
//!
//! The fixture server holds two CAs, `ca0` (the default) and `ca2`, sharing
//! one set of fakes. Registered identities:
//!
//! | id          | password      | type   | affiliation   | registrar for  |
//! |-------------|---------------|--------|---------------|----------------|
//! | `admin`     | `adminpw`     | client | root          | `client,peer`  |
//! | `org1admin` | `org1adminpw` | client | `org1`        | `client,peer`  |
//! | `user1`     | `user1pw`     | client | `org1.dept1`  | -              |
//!
//! Tokens are `<cn>.<hex(sha256(cn || body))>`; see [`sign_token`].

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use base64::prelude::*;
use bytes::Bytes;
use dashmap::DashMap;
use keyward_core::{
    Attribute, AttributeManager, AuthenticatedIdentity, CaDatabase, Certificate,
    CertificateRecord, CertificateSigner, CertificateStatus, CertificateStore, CredentialVerifier,
    RevocationChecker, RevocationStatus, SignRequest, User, UserRegistry,
};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::ca::{CaComponents, CaServer, CertificateAuthority};
use crate::config::CaConfig;
use crate::context::{BodySource, RequestContext, REGISTRAR_ROLES_ATTR};
use crate::network::module::routes;
use crate::network::{AppState, NetworkConfig};

const TRUSTED_AKI: [u8; 2] = [0x0a, 0xbc];
const FOREIGN_AKI: [u8; 2] = [0xde, 0xad];
const SERIAL: [u8; 2] = [0x00, 0x1f];

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub(crate) struct FakeUser {
    name: String,
    password: String,
    user_type: String,
    affiliation: Vec<String>,
    attrs: Vec<Attribute>,
    fail_attributes: bool,
    enrollments: AtomicI32,
}

impl FakeUser {
    pub(crate) fn new(name: &str, password: &str, user_type: &str, affiliation: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            password: password.to_string(),
            user_type: user_type.to_string(),
            affiliation: affiliation.iter().map(ToString::to_string).collect(),
            attrs: Vec::new(),
            fail_attributes: false,
            enrollments: AtomicI32::new(0),
        }
    }

    pub(crate) fn with_attr(mut self, attr: Attribute) -> Self {
        self.attrs.push(attr);
        self
    }

    /// Makes attribute listing fail.
    pub(crate) fn failing_attributes(mut self) -> Self {
        self.fail_attributes = true;
        self
    }
}

#[async_trait]
impl User for FakeUser {
    fn name(&self) -> &str {
        &self.name
    }

    fn user_type(&self) -> &str {
        &self.user_type
    }

    fn affiliation_path(&self) -> Vec<String> {
        self.affiliation.clone()
    }

    fn attribute(&self, name: &str) -> anyhow::Result<Attribute> {
        self.attrs
            .iter()
            .find(|attr| attr.name == name)
            .cloned()
            .ok_or_else(|| anyhow!("attribute '{name}' not found for '{}'", self.name))
    }

    fn attributes(&self, names: Option<&[String]>) -> anyhow::Result<Vec<Attribute>> {
        if self.fail_attributes {
            bail!("attribute store unavailable");
        }
        Ok(self
            .attrs
            .iter()
            .filter(|attr| names.is_none_or(|names| names.contains(&attr.name)))
            .cloned()
            .collect())
    }

    async fn login(&self, password: &str, ca_max_enrollments: i32) -> anyhow::Result<()> {
        if password != self.password {
            bail!("incorrect password for '{}'", self.name);
        }
        let count = self.enrollments.load(Ordering::SeqCst);
        if ca_max_enrollments > 0 && count >= ca_max_enrollments {
            bail!("'{}' has reached the maximum of {ca_max_enrollments} enrollments", self.name);
        }
        self.enrollments.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeRegistry {
    users: DashMap<String, Arc<dyn User>>,
    /// Number of `get_user` calls.
    pub(crate) lookups: AtomicUsize,
}

impl FakeRegistry {
    pub(crate) fn insert(&self, user: FakeUser) {
        self.users.insert(user.name.clone(), Arc::new(user));
    }

    pub(crate) fn remove(&self, id: &str) {
        self.users.remove(id);
    }
}

#[async_trait]
impl UserRegistry for FakeRegistry {
    async fn get_user(&self, id: &str) -> anyhow::Result<Arc<dyn User>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.users
            .get(id)
            .map(|user| Arc::clone(user.value()))
            .ok_or_else(|| anyhow!("identity '{id}' not found"))
    }
}

fn seeded_registry() -> FakeRegistry {
    let registry = FakeRegistry::default();
    registry.insert(
        FakeUser::new("admin", "adminpw", "client", &[])
            .with_attr(Attribute::new(REGISTRAR_ROLES_ATTR, "client,peer"))
            .with_attr(Attribute::new("role", "admin").with_ecert()),
    );
    registry.insert(
        FakeUser::new("org1admin", "org1adminpw", "client", &["org1"])
            .with_attr(Attribute::new(REGISTRAR_ROLES_ATTR, "client,peer")),
    );
    registry.insert(
        FakeUser::new("user1", "user1pw", "client", &["org1", "dept1"])
            .with_attr(Attribute::new("dept", "dept1")),
    );
    registry
}

// ---------------------------------------------------------------------------
// Certificates and tokens
// ---------------------------------------------------------------------------

/// Certificate a token signed by `cn` resolves to. `foreigner` is issued by
/// another CA.
pub(crate) fn certificate_for(cn: &str) -> Certificate {
    let aki = if cn == "foreigner" { FOREIGN_AKI } else { TRUSTED_AKI };
    Certificate {
        serial_number: SERIAL.to_vec(),
        authority_key_id: aki.to_vec(),
        subject_common_name: cn.to_string(),
        der: Bytes::new(),
    }
}

pub(crate) fn admin_certificate() -> Certificate {
    certificate_for("admin")
}

fn token_digest(cn: &str, body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(cn.as_bytes());
    hasher.update(body);
    hex::encode(hasher.finalize())
}

/// Token for `cn` bound to `body`.
pub(crate) fn sign_token(cn: &str, body: &[u8]) -> String {
    format!("{cn}.{}", token_digest(cn, body))
}

pub(crate) fn basic_header(user: &str, password: &str) -> String {
    format!("Basic {}", BASE64_STANDARD.encode(format!("{user}:{password}")))
}

#[derive(Default)]
pub(crate) struct FakeVerifier;

#[async_trait]
impl CredentialVerifier for FakeVerifier {
    async fn verify_token(&self, token: &str, body: &[u8]) -> anyhow::Result<Certificate> {
        let (cn, digest) = token
            .split_once('.')
            .ok_or_else(|| anyhow!("malformed token"))?;
        if digest != token_digest(cn, body) {
            bail!("token signature does not match request");
        }
        Ok(certificate_for(cn))
    }

    async fn verify_chain(&self, certificate: &Certificate) -> anyhow::Result<()> {
        if certificate.authority_key_id != TRUSTED_AKI {
            bail!("certificate was not issued by this CA");
        }
        Ok(())
    }
}

pub(crate) struct FakeRevocation {
    status: Mutex<RevocationStatus>,
}

impl FakeRevocation {
    pub(crate) fn new(status: RevocationStatus) -> Self {
        Self {
            status: Mutex::new(status),
        }
    }

    pub(crate) fn set(&self, status: RevocationStatus) {
        *self.status.lock() = status;
    }
}

impl Default for FakeRevocation {
    fn default() -> Self {
        Self::new(RevocationStatus::valid())
    }
}

#[async_trait]
impl RevocationChecker for FakeRevocation {
    async fn check(&self, _certificate: &Certificate) -> RevocationStatus {
        *self.status.lock()
    }
}

pub(crate) struct FakeCertStore {
    pub(crate) fail: AtomicBool,
    pub(crate) records: Mutex<Vec<CertificateRecord>>,
    /// `(serial, aki)` of the last query.
    pub(crate) last_query: Mutex<Option<(String, String)>>,
}

impl Default for FakeCertStore {
    fn default() -> Self {
        let admin = admin_certificate();
        Self {
            fail: AtomicBool::new(false),
            records: Mutex::new(vec![CertificateRecord {
                id: "admin".to_string(),
                serial_number: admin.serial_hex(),
                authority_key_id: admin.authority_key_id_hex(),
                status: CertificateStatus::Good,
            }]),
            last_query: Mutex::new(None),
        }
    }
}

#[async_trait]
impl CertificateStore for FakeCertStore {
    async fn get_certificate(
        &self,
        serial: &str,
        aki: &str,
    ) -> anyhow::Result<Vec<CertificateRecord>> {
        *self.last_query.lock() = Some((serial.to_string(), aki.to_string()));
        if self.fail.load(Ordering::SeqCst) {
            bail!("certificate table unavailable");
        }
        Ok(self
            .records
            .lock()
            .iter()
            .filter(|record| record.serial_number == serial && record.authority_key_id == aki)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Database and signer
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct FakeDatabase {
    /// Number of initialization attempts, failed ones included.
    pub(crate) inits: AtomicUsize,
    pub(crate) fail: AtomicBool,
}

#[async_trait]
impl CaDatabase for FakeDatabase {
    async fn initialize(&self) -> anyhow::Result<()> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            bail!("database unavailable");
        }
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeSigner {
    pub(crate) fail: AtomicBool,
    pub(crate) last_request: Mutex<Option<SignRequest>>,
}

#[async_trait]
impl CertificateSigner for FakeSigner {
    async fn sign(&self, request: SignRequest) -> anyhow::Result<String> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("signing key unavailable");
        }
        let pem = format!(
            "-----BEGIN CERTIFICATE-----\n{}\n-----END CERTIFICATE-----\n",
            BASE64_STANDARD.encode(&request.enrollment_id)
        );
        *self.last_request.lock() = Some(request);
        Ok(pem)
    }
}

/// Components backed by fresh fakes.
pub(crate) fn components() -> CaComponents {
    CaComponents {
        registry: Arc::new(seeded_registry()),
        certificates: Arc::new(FakeCertStore::default()),
        verifier: Arc::new(FakeVerifier),
        revocation: Arc::new(FakeRevocation::default()),
        attributes: Arc::new(AttributeManager),
        database: Arc::new(FakeDatabase::default()),
        signer: Arc::new(FakeSigner::default()),
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Body that counts transport reads.
pub(crate) struct CountingBody {
    data: Bytes,
    reads: Arc<AtomicUsize>,
}

impl CountingBody {
    pub(crate) fn new(data: &'static str) -> Self {
        Self {
            data: Bytes::from_static(data.as_bytes()),
            reads: Arc::default(),
        }
    }

    pub(crate) fn reads(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.reads)
    }
}

#[async_trait]
impl BodySource for CountingBody {
    async fn read_all(&mut self) -> anyhow::Result<Bytes> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.data.clone())
    }
}

/// Body whose transport read always fails.
#[derive(Default)]
pub(crate) struct FailingBody {
    reads: Arc<AtomicUsize>,
}

impl FailingBody {
    pub(crate) fn reads(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.reads)
    }
}

#[async_trait]
impl BodySource for FailingBody {
    async fn read_all(&mut self) -> anyhow::Result<Bytes> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        bail!("connection reset")
    }
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

/// A CA server over shared fakes, plus handles to inspect them.
pub(crate) struct Fixture {
    pub(crate) server: Arc<CaServer>,
    pub(crate) registry: Arc<FakeRegistry>,
    pub(crate) certificates: Arc<FakeCertStore>,
    pub(crate) revocation: Arc<FakeRevocation>,
    pub(crate) database: Arc<FakeDatabase>,
    pub(crate) signer: Arc<FakeSigner>,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Builds the fixture, letting `configure` adjust the default CA.
    pub(crate) fn with_config(configure: impl FnOnce(&mut CaConfig)) -> Self {
        let registry = Arc::new(seeded_registry());
        let certificates = Arc::new(FakeCertStore::default());
        let revocation = Arc::new(FakeRevocation::default());
        let database = Arc::new(FakeDatabase::default());
        let signer = Arc::new(FakeSigner::default());

        let components = CaComponents {
            registry: registry.clone(),
            certificates: certificates.clone(),
            verifier: Arc::new(FakeVerifier),
            revocation: revocation.clone(),
            attributes: Arc::new(AttributeManager),
            database: database.clone(),
            signer: signer.clone(),
        };

        let mut ca0 = CaConfig::new("ca0");
        configure(&mut ca0);
        let server = CaServer::new("ca0");
        server.add_ca(CertificateAuthority::new(ca0, components.clone()));
        server.add_ca(CertificateAuthority::new(CaConfig::new("ca2"), components));

        Self {
            server: Arc::new(server),
            registry,
            certificates,
            revocation,
            database,
            signer,
        }
    }

    pub(crate) fn request(path: &str) -> http::request::Builder {
        http::Request::builder().uri(path)
    }

    pub(crate) fn context(&self, request: http::Request<Bytes>) -> RequestContext {
        let (parts, body) = request.into_parts();
        RequestContext::new(parts, body, Arc::clone(&self.server))
    }

    pub(crate) fn context_with_body(
        &self,
        request: http::request::Builder,
        body: impl BodySource + 'static,
    ) -> RequestContext {
        let (parts, ()) = request
            .body(())
            .expect("valid test request")
            .into_parts();
        RequestContext::new(parts, body, Arc::clone(&self.server))
    }

    /// Application routes over the fixture server, without transport
    /// middleware.
    pub(crate) fn router(&self) -> axum::Router {
        routes(AppState {
            server: Arc::clone(&self.server),
            config: Arc::new(NetworkConfig::default()),
            start_time: Instant::now(),
        })
    }

    /// Unauthenticated context with an empty body.
    pub(crate) fn empty_context(&self, path: &str) -> RequestContext {
        self.context_with_body(Self::request(path), Bytes::new())
    }

    /// Context already authenticated as `id` via basic auth, without
    /// touching the registry.
    pub(crate) fn authenticated_context(&self, id: &str) -> RequestContext {
        let mut ctx = self.empty_context("/");
        ctx.bind_identity(AuthenticatedIdentity::Basic {
            username: id.to_string(),
        })
        .expect("fresh context accepts an identity");
        ctx
    }
}
