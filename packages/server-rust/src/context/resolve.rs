//! Resolution of the CA a request targets.

use std::sync::Arc;

use axum::extract::Query;
use tracing::{debug, warn};

use super::RequestContext;
use crate::ca::CertificateAuthority;
use crate::error::{ContextError, ErrorKind};

impl RequestContext {
    /// Name of the CA this request targets.
    ///
    /// Checked in order: the first `ca` query parameter, a `caname` field in
    /// a JSON object body, and the server's default CA name.
    ///
    /// # Errors
    ///
    /// Fails only if the body cannot be read or is not valid JSON.
    pub async fn ca_name(&mut self) -> Result<String, ContextError> {
        if let Some(name) = self.query_ca() {
            return Ok(name);
        }

        let body: Option<serde_json::Value> = self.try_read_body().await?;
        let from_body = body
            .as_ref()
            .and_then(|body| body.get("caname"))
            .and_then(serde_json::Value::as_str)
            .filter(|name| !name.is_empty());
        if let Some(name) = from_body {
            return Ok(name.to_string());
        }

        Ok(self.server.default_ca_name().to_string())
    }

    /// The CA this request targets, with its database initialized.
    ///
    /// Every operation that needs a CA goes through here so the database is
    /// ready before it is used.
    ///
    /// # Errors
    ///
    /// Returns the resolution error (`CaNotFound`, body errors), or
    /// `CaInitialization` if the database cannot be initialized.
    pub async fn ca(&mut self) -> Result<Arc<CertificateAuthority>, ContextError> {
        let ca = self
            .resolve_ca()
            .await
            .map_err(|err| err.context("Failed to get CA instance"))?;

        if !ca.is_db_initialized() {
            if let Err(err) = ca.ensure_db_initialized().await {
                let uri = self.parts.uri.to_string();
                let handler = uri.trim_start_matches('/');
                warn!(ca = %ca.name(), handler, error = %err, "CA database initialization failed");
                return Err(ContextError::wrap(
                    ErrorKind::CaInitialization,
                    format!("{handler} handler failed to initialize DB"),
                    err,
                ));
            }
        }
        Ok(ca)
    }

    /// First non-empty `ca` pair of the query string. Repeated or unrelated
    /// parameters never hide it.
    fn query_ca(&self) -> Option<String> {
        let Query(pairs) = match Query::<Vec<(String, String)>>::try_from_uri(&self.parts.uri) {
            Ok(pairs) => pairs,
            Err(err) => {
                debug!(error = %err, "ignoring unparseable query string");
                return None;
            }
        };
        pairs
            .into_iter()
            .find(|(key, _)| key == "ca")
            .map(|(_, name)| name)
            .filter(|name| !name.is_empty())
    }

    /// Resolves and memoizes the target CA without touching its database.
    async fn resolve_ca(&mut self) -> Result<Arc<CertificateAuthority>, ContextError> {
        if let Some(ca) = &self.ca {
            return Ok(Arc::clone(ca));
        }
        let name = self.ca_name().await?;
        let ca = self.server.get_ca(&name)?;
        debug!(ca = %name, "resolved target CA");
        self.ca = Some(Arc::clone(&ca));
        Ok(ca)
    }
}
