use std::sync::Arc;

use keyward_core::User;

use super::RequestContext;
use crate::error::{ContextError, ErrorKind};

impl RequestContext {
    /// Registry record of the authenticated caller, fetched once per request.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` if called before authentication succeeded (a
    /// handler bug, hence server-class), `CallerLookup` if the registry
    /// lookup fails, or any CA resolution error.
    pub async fn caller(&mut self) -> Result<Arc<dyn User>, ContextError> {
        if let Some(caller) = &self.caller {
            return Ok(Arc::clone(caller));
        }

        let id = self
            .enrollment_id()
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                ContextError::new(ErrorKind::NotAuthenticated, "Caller is not authenticated")
            })?;
        let ca = self.ca().await?;
        let caller = ca
            .registry()
            .get_user(&id)
            .await
            .map_err(|err| ContextError::wrap(ErrorKind::CallerLookup, "Failed to get user", err))?;

        self.caller = Some(Arc::clone(&caller));
        Ok(caller)
    }
}
