//! Basic (password) and token authentication.

use base64::prelude::*;
use keyward_core::{AuthenticatedIdentity, CertificateStatus};
use tracing::debug;

use super::revocation::ensure_not_revoked;
use super::RequestContext;
use crate::error::{ContextError, ErrorKind};

const BASIC_PREFIX: &str = "Basic ";

impl RequestContext {
    /// Authenticates the username and password in the `authorization`
    /// header and returns the username.
    ///
    /// # Errors
    ///
    /// `NoAuthHeader`, `NoUserPass`, `EnrollmentDisabled` (the CA's
    /// max-enrollments is 0), `InvalidUser`, `InvalidPassword`, or any CA
    /// resolution error.
    pub async fn basic_authentication(&mut self) -> Result<String, ContextError> {
        let result = self.authenticate_basic().await;
        record_attempt("basic", &result);
        result
    }

    /// Authenticates the signed token in the `authorization` header and
    /// returns the enrollment ID of the certificate that signed it.
    ///
    /// The token signature covers the header and the request body, so a
    /// token cannot be replayed with a different body.
    ///
    /// # Errors
    ///
    /// `NoAuthHeader`, `InvalidToken`, `UntrustedCertificate`,
    /// `RevocationCheckFailure`, `CertificateExpiredOrRevoked`,
    /// `CertificateLookup`, `CertificateNotFound`, `CertificateRevoked`, or
    /// any CA resolution or body error.
    pub async fn token_authentication(&mut self) -> Result<String, ContextError> {
        let result = self.authenticate_token().await;
        record_attempt("token", &result);
        result
    }

    async fn authenticate_basic(&mut self) -> Result<String, ContextError> {
        let header = self.authorization_header(ErrorKind::NoUserPass)?;
        let (username, password) = parse_basic(&header).ok_or_else(|| {
            ContextError::new(ErrorKind::NoUserPass, "No user/pass in authorization header")
        })?;

        let ca = self.ca().await?;
        let max_enrollments = ca.config().registry.max_enrollments;
        debug!(ca = %ca.name(), max_enrollments, "authenticating with password");
        if max_enrollments == 0 {
            return Err(ContextError::new(
                ErrorKind::EnrollmentDisabled,
                "Enroll is disabled",
            ));
        }

        let user = ca
            .registry()
            .get_user(&username)
            .await
            .map_err(|err| ContextError::wrap(ErrorKind::InvalidUser, "Failed to get user", err))?;
        user.login(&password, max_enrollments)
            .await
            .map_err(|err| ContextError::wrap(ErrorKind::InvalidPassword, "Login failure", err))?;

        self.bind_identity(AuthenticatedIdentity::Basic {
            username: username.clone(),
        })?;
        debug!(enrollment_id = %username, "successful basic authentication");
        Ok(username)
    }

    async fn authenticate_token(&mut self) -> Result<String, ContextError> {
        let token = self.authorization_header(ErrorKind::InvalidToken)?;
        let ca = self.ca().await?;
        let body = self.read_body_bytes().await?;

        let certificate = ca.verifier().verify_token(&token, &body).await.map_err(|err| {
            ContextError::wrap(
                ErrorKind::InvalidToken,
                "Invalid token in authorization header",
                err,
            )
        })?;
        ca.verifier()
            .verify_chain(&certificate)
            .await
            .map_err(|err| {
                ContextError::wrap(ErrorKind::UntrustedCertificate, "Untrusted certificate", err)
            })?;

        let id = certificate.enrollment_id().to_string();
        debug!(enrollment_id = %id, "checking certificate for revocation and expiry");
        ensure_not_revoked(ca.revocation(), &certificate).await?;

        let aki = certificate.authority_key_id_hex();
        let serial = certificate.serial_hex();
        let records = ca
            .certificates()
            .get_certificate(&serial, &aki)
            .await
            .map_err(|err| {
                ContextError::wrap(
                    ErrorKind::CertificateLookup,
                    "Failed searching certificates",
                    err,
                )
            })?;
        if records.is_empty() {
            return Err(ContextError::new(
                ErrorKind::CertificateNotFound,
                format!("Certificate not found with AKI '{aki}' and serial '{serial}'"),
            ));
        }
        if records
            .iter()
            .any(|record| record.status == CertificateStatus::Revoked)
        {
            return Err(ContextError::new(
                ErrorKind::CertificateRevoked,
                "The certificate in the authorization header is a revoked certificate",
            ));
        }

        self.bind_identity(AuthenticatedIdentity::Token {
            enrollment_id: id.clone(),
            certificate,
        })?;
        debug!(enrollment_id = %id, "successful token authentication");
        Ok(id)
    }

    /// The raw `authorization` header value. A value that is not visible
    /// ASCII fails with `invalid`.
    fn authorization_header(&self, invalid: ErrorKind) -> Result<String, ContextError> {
        let value = self
            .parts
            .headers
            .get(http::header::AUTHORIZATION)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ContextError::new(ErrorKind::NoAuthHeader, "No authorization header"))?;
        value.to_str().map(str::to_owned).map_err(|err| {
            ContextError::wrap(invalid, "Authorization header is not valid text", err)
        })
    }
}

/// Extracts username and password from a `Basic` credential.
fn parse_basic(header: &str) -> Option<(String, String)> {
    let scheme = header.get(..BASIC_PREFIX.len())?;
    if !scheme.eq_ignore_ascii_case(BASIC_PREFIX) {
        return None;
    }
    let decoded = BASE64_STANDARD
        .decode(header.get(BASIC_PREFIX.len()..)?)
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

fn record_attempt(scheme: &'static str, result: &Result<String, ContextError>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(err) => err.kind().as_str(),
    };
    metrics::counter!(
        "keyward_authentications_total",
        "scheme" => scheme,
        "outcome" => outcome
    )
    .increment(1);
}
