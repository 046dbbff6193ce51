use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A name/value attribute registered on an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
    /// Embed this attribute in enrollment certificates when the caller
    /// does not request attributes explicitly.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ecert: bool,
}

impl Attribute {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ecert: false,
        }
    }

    /// Marks the attribute for default inclusion in enrollment certificates.
    #[must_use]
    pub fn with_ecert(mut self) -> Self {
        self.ecert = true;
        self
    }
}

/// A request to embed an attribute in an issued certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRequest {
    pub name: String,
    /// Optional requests are skipped when the identity lacks the attribute;
    /// required ones fail the whole request.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
}

impl AttributeRequest {
    #[must_use]
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: false,
        }
    }

    #[must_use]
    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: true,
        }
    }
}

/// Resolved attribute payload embedded in a certificate.
///
/// Uses `BTreeMap` so the serialized form is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub attrs: BTreeMap<String, String>,
}

impl Attributes {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }
}

/// Certificate extension descriptor handed to the signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeExtension {
    /// Dotted object identifier.
    pub id: String,
    pub critical: bool,
    /// Hex encoding of the JSON-serialized [`Attributes`].
    pub value: String,
}

/// Signer certificate recovered from a verified token.
///
/// Parsing X.509 is the verifier's job; this carries only the fields the
/// request context consults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// Serial number, big-endian.
    pub serial_number: Vec<u8>,
    pub authority_key_id: Vec<u8>,
    pub subject_common_name: String,
    pub der: Bytes,
}

impl Certificate {
    /// The enrollment ID the certificate was issued to.
    #[must_use]
    pub fn enrollment_id(&self) -> &str {
        &self.subject_common_name
    }

    /// Serial number as lowercase hex without leading zeros, the form the
    /// certificate store is keyed by.
    #[must_use]
    pub fn serial_hex(&self) -> String {
        trimmed_hex(&self.serial_number)
    }

    /// Authority key identifier as lowercase hex without leading zeros.
    #[must_use]
    pub fn authority_key_id_hex(&self) -> String {
        trimmed_hex(&self.authority_key_id)
    }
}

fn trimmed_hex(bytes: &[u8]) -> String {
    hex::encode(bytes).trim_start_matches('0').to_string()
}

/// Lifecycle status of an issued certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateStatus {
    Good,
    Revoked,
}

/// A row from the CA's certificate store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRecord {
    pub id: String,
    pub serial_number: String,
    pub authority_key_id: String,
    pub status: CertificateStatus,
}

/// Verdict of a revocation/expiry evaluation.
///
/// `checked == false` means the evaluation itself could not be carried out;
/// `revoked_or_expired` is only meaningful when `checked` is true.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevocationStatus {
    pub revoked_or_expired: bool,
    pub checked: bool,
}

impl RevocationStatus {
    #[must_use]
    pub fn valid() -> Self {
        Self {
            revoked_or_expired: false,
            checked: true,
        }
    }

    #[must_use]
    pub fn revoked_or_expired() -> Self {
        Self {
            revoked_or_expired: true,
            checked: true,
        }
    }

    #[must_use]
    pub fn unchecked() -> Self {
        Self {
            revoked_or_expired: false,
            checked: false,
        }
    }
}

/// Everything the issuance pipeline needs once the request is authorized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignRequest {
    pub enrollment_id: String,
    /// PEM-encoded certificate signing request.
    pub certificate_request: String,
    pub profile: String,
    pub extensions: Vec<AttributeExtension>,
}
