use crate::types::Certificate;

/// Identity established by one of the two authentication schemes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticatedIdentity {
    /// Username verified by password (basic authentication).
    Basic { username: String },
    /// Enrollment ID taken from a verified, unrevoked certificate (token
    /// authentication).
    Token {
        enrollment_id: String,
        certificate: Certificate,
    },
}

impl AuthenticatedIdentity {
    /// The enrollment ID bound to the request.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Basic { username } => username,
            Self::Token { enrollment_id, .. } => enrollment_id,
        }
    }

    /// The caller's enrollment certificate, present only for token
    /// authentication.
    #[must_use]
    pub fn certificate(&self) -> Option<&Certificate> {
        match self {
            Self::Basic { .. } => None,
            Self::Token { certificate, .. } => Some(certificate),
        }
    }

    #[must_use]
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Basic { .. } => "basic",
            Self::Token { .. } => "token",
        }
    }
}
