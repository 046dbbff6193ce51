use keyward_core::{default_requests, AttributeExtension, AttributeRequest, ATTRIBUTE_OID};
use tracing::debug;

use super::RequestContext;
use crate::error::{ContextError, ErrorKind};

impl RequestContext {
    /// Builds the attribute extension to embed in the certificate being
    /// issued to the caller.
    ///
    /// Without explicit `requests`, every caller attribute flagged for
    /// enrollment certificates is requested. Returns `None` when the CA is
    /// LDAP-backed or nothing is to be embedded.
    ///
    /// # Errors
    ///
    /// `AttributeRequest` if the attribute policy rejects the requests,
    /// `ExtensionEncoding` if the payload cannot be serialized, or any error
    /// from resolving the CA or the caller.
    pub async fn attr_extension(
        &mut self,
        requests: Option<Vec<AttributeRequest>>,
        profile: &str,
    ) -> Result<Option<AttributeExtension>, ContextError> {
        let ca = self.ca().await?;
        if ca.config().ldap.enabled {
            debug!(ca = %ca.name(), "LDAP enabled, no attributes added to certificate");
            return Ok(None);
        }

        let caller = self.caller().await?;
        let available = caller.attributes(None).unwrap_or_else(|err| {
            debug!(caller = %caller.name(), error = %err, "failed to list caller attributes");
            Vec::new()
        });

        let Some(requests) = requests.or_else(|| default_requests(&available)) else {
            return Ok(None);
        };

        let resolved = ca
            .attributes()
            .process(&requests, &available)
            .map_err(|err| {
                ContextError::wrap(
                    ErrorKind::AttributeRequest,
                    "Failed to process attribute requests",
                    err,
                )
            })?;
        let Some(resolved) = resolved else {
            return Ok(None);
        };

        let payload = serde_json::to_vec(&resolved).map_err(|err| {
            ContextError::wrap(
                ErrorKind::ExtensionEncoding,
                "Failed to marshal attributes",
                err,
            )
        })?;
        let extension = AttributeExtension {
            id: ATTRIBUTE_OID.to_string(),
            critical: false,
            value: hex::encode(payload),
        };
        debug!(profile, extension = ?extension, "attribute extension added to certificate");
        Ok(Some(extension))
    }
}
