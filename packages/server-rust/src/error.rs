//! Structured errors raised while authenticating and authorizing a request.
//!
//! Every failure carries a stable [`ErrorKind`] for programmatic handling,
//! the HTTP status the kind maps to, a human-readable message, and the
//! collaborator error it wraps, if any.

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{debug, warn};

/// Message sent to clients in place of the local message for every
/// authentication-class failure.
const AUTH_FAILURE_MESSAGE: &str = "Authentication failure";

/// Stable error kinds surfaced by the request context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NoAuthHeader,
    NoUserPass,
    EnrollmentDisabled,
    InvalidUser,
    InvalidPassword,
    InvalidToken,
    UntrustedCertificate,
    RevocationCheckFailure,
    CertificateExpiredOrRevoked,
    CertificateLookup,
    CertificateNotFound,
    CertificateRevoked,
    NotAuthenticated,
    IdentityAlreadyBound,
    NotAffiliated,
    RegistrarAttribute,
    EmptyBody,
    BadRequestBody,
    ReadBody,
    CaNotFound,
    CaInitialization,
    CallerLookup,
    AttributeRequest,
    ExtensionEncoding,
    IdentityNotFound,
    Signing,
}

impl ErrorKind {
    /// Stable tag used in logs, metrics labels and response bodies.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoAuthHeader => "NoAuthHeaderError",
            Self::NoUserPass => "NoUserPassError",
            Self::EnrollmentDisabled => "EnrollmentDisabledError",
            Self::InvalidUser => "InvalidUserError",
            Self::InvalidPassword => "InvalidPasswordError",
            Self::InvalidToken => "InvalidTokenError",
            Self::UntrustedCertificate => "UntrustedCertificateError",
            Self::RevocationCheckFailure => "RevocationCheckFailureError",
            Self::CertificateExpiredOrRevoked => "CertificateExpiredOrRevokedError",
            Self::CertificateLookup => "CertificateLookupError",
            Self::CertificateNotFound => "CertificateNotFoundError",
            Self::CertificateRevoked => "CertificateRevokedError",
            Self::NotAuthenticated => "NotAuthenticatedError",
            Self::IdentityAlreadyBound => "IdentityAlreadyBoundError",
            Self::NotAffiliated => "NotAffiliatedError",
            Self::RegistrarAttribute => "RegistrarAttributeError",
            Self::EmptyBody => "EmptyBodyError",
            Self::BadRequestBody => "BadRequestBodyError",
            Self::ReadBody => "ReadBodyError",
            Self::CaNotFound => "CANotFoundError",
            Self::CaInitialization => "CAInitializationError",
            Self::CallerLookup => "CallerLookupError",
            Self::AttributeRequest => "AttributeRequestError",
            Self::ExtensionEncoding => "ExtensionEncodingError",
            Self::IdentityNotFound => "IdentityNotFoundError",
            Self::Signing => "SigningError",
        }
    }

    /// HTTP status class of the kind.
    #[must_use]
    pub fn status(self) -> StatusCode {
        match self {
            Self::NoAuthHeader
            | Self::NoUserPass
            | Self::EnrollmentDisabled
            | Self::InvalidUser
            | Self::InvalidPassword
            | Self::InvalidToken
            | Self::UntrustedCertificate
            | Self::CertificateExpiredOrRevoked
            | Self::CertificateNotFound
            | Self::CertificateRevoked
            | Self::NotAffiliated
            | Self::RegistrarAttribute => StatusCode::UNAUTHORIZED,
            Self::EmptyBody | Self::BadRequestBody | Self::ReadBody | Self::AttributeRequest => {
                StatusCode::BAD_REQUEST
            }
            Self::CaNotFound | Self::IdentityNotFound => StatusCode::NOT_FOUND,
            Self::RevocationCheckFailure
            | Self::CertificateLookup
            | Self::NotAuthenticated
            | Self::IdentityAlreadyBound
            | Self::CaInitialization
            | Self::CallerLookup
            | Self::ExtensionEncoding
            | Self::Signing => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the kind is an authentication/authorization rejection whose
    /// details stay server-side.
    #[must_use]
    pub fn is_auth_failure(self) -> bool {
        self.status() == StatusCode::UNAUTHORIZED
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure raised by the request context.
///
/// Renders as `message` or, when a collaborator error is wrapped,
/// `message: cause` with the cause's full chain.
#[derive(Debug, thiserror::Error)]
#[error("{message}{}", render_cause(.source))]
pub struct ContextError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<anyhow::Error>,
}

fn render_cause(source: &Option<anyhow::Error>) -> String {
    source
        .as_ref()
        .map(|cause| format!(": {cause:#}"))
        .unwrap_or_default()
}

impl ContextError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Wraps a collaborator error, keeping its text in the rendered chain.
    #[must_use]
    pub fn wrap(kind: ErrorKind, message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Prefixes the message, keeping kind and cause.
    #[must_use]
    pub fn context(mut self, message: &str) -> Self {
        self.message = format!("{message}: {}", self.message);
        self
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    /// Local message without the wrapped cause.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Message safe to send to the client.
    #[must_use]
    pub fn remote_message(&self) -> String {
        if self.kind.is_auth_failure() {
            AUTH_FAILURE_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }
}

impl IntoResponse for ContextError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(kind = %self.kind, error = %self, "request failed");
        } else {
            debug!(kind = %self.kind, error = %self, "request rejected");
        }

        let body = json!({
            "success": false,
            "result": null,
            "errors": [{
                "kind": self.kind.as_str(),
                "message": self.remote_message(),
            }],
            "messages": [],
        });
        (status, Json(body)).into_response()
    }
}
