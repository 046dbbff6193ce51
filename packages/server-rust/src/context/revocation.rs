//! Revocation and expiry gate for presented certificates.

use keyward_core::{Certificate, RevocationChecker};
use tracing::warn;

use crate::error::{ContextError, ErrorKind};

/// Fails unless the certificate is neither expired nor revoked.
///
/// An evaluation that could not be carried out is an infrastructure failure
/// (`RevocationCheckFailure`), never a revoked verdict.
pub(super) async fn ensure_not_revoked(
    checker: &dyn RevocationChecker,
    certificate: &Certificate,
) -> Result<(), ContextError> {
    let status = checker.check(certificate).await;
    if !status.checked {
        warn!(
            enrollment_id = %certificate.enrollment_id(),
            "revocation check could not be evaluated"
        );
        return Err(ContextError::new(
            ErrorKind::RevocationCheckFailure,
            "Failed while checking for revocation",
        ));
    }
    if status.revoked_or_expired {
        return Err(ContextError::new(
            ErrorKind::CertificateExpiredOrRevoked,
            "The certificate in the authorization header is a revoked or expired certificate",
        ));
    }
    Ok(())
}
