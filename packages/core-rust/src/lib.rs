//! Keyward Core: identity, attribute and certificate types, and the
//! capabilities a certificate authority exposes to request handling.

pub mod attrs;
pub mod identity;
pub mod traits;
pub mod types;

pub use attrs::{default_requests, AttributeError, AttributeManager, ATTRIBUTE_OID};
pub use identity::AuthenticatedIdentity;
pub use traits::{
    AttributeProcessor, CaDatabase, CertificateSigner, CertificateStore, CredentialVerifier,
    RevocationChecker, User, UserRegistry,
};
pub use types::{
    Attribute, AttributeExtension, AttributeRequest, Attributes, Certificate, CertificateRecord,
    CertificateStatus, RevocationStatus, SignRequest,
};
