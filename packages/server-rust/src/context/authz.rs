//! Authorization: registrar roles, affiliation containment, and the
//! combined "can manage user" decision.

use keyward_core::User;
use tracing::debug;

use super::RequestContext;
use crate::error::{ContextError, ErrorKind};

/// Attribute listing the identity types a registrar may manage,
/// comma-separated.
pub const REGISTRAR_ROLES_ATTR: &str = "hf.Registrar.Roles";

impl RequestContext {
    /// Returns the identity types the caller may manage if the caller is a
    /// registrar, `None` otherwise.
    ///
    /// A missing or empty roles attribute means "not a registrar"; it is not
    /// an error.
    ///
    /// # Errors
    ///
    /// Any error from resolving the caller.
    pub async fn is_registrar(&mut self) -> Result<Option<String>, ContextError> {
        let caller = self.caller().await?;
        debug!(caller = %caller.name(), "checking whether caller is a registrar");

        match caller.attribute(REGISTRAR_ROLES_ATTR) {
            Ok(attr) if !attr.value.is_empty() => Ok(Some(attr.value)),
            Ok(_) => Ok(None),
            Err(err) => {
                debug!(caller = %caller.name(), error = %err, "no registrar roles");
                Ok(None)
            }
        }
    }

    /// Whether the caller, a registrar, may act on identities of `user_type`.
    ///
    /// # Errors
    ///
    /// `RegistrarAttribute` if the caller is not a registrar at all, or any
    /// error from resolving the caller.
    pub async fn can_act_on_type(&mut self, user_type: &str) -> Result<bool, ContextError> {
        let caller = self.caller().await?;
        debug!(caller = %caller.name(), user_type, "checking whether caller can act on type");

        let Some(roles) = self.is_registrar().await? else {
            return Err(ContextError::new(
                ErrorKind::RegistrarAttribute,
                format!("'{}' is not allowed to manage users", caller.name()),
            ));
        };

        let allowed = roles.split(',').any(|role| role == user_type);
        if !allowed {
            debug!(roles = %roles, user_type, "caller is not authorized to act on type");
        }
        Ok(allowed)
    }

    /// Whether `affiliation` falls under the caller's affiliation.
    ///
    /// A caller at the root affiliation contains every affiliation. Otherwise
    /// containment is a plain string-prefix test on the dot-joined path, so
    /// `org1` also contains `org12`.
    ///
    /// # Errors
    ///
    /// Any error from resolving the caller.
    pub async fn contains_affiliation(&mut self, affiliation: &str) -> Result<bool, ContextError> {
        let caller = self.caller().await?;
        let caller_affiliation = caller.affiliation_path().join(".");
        debug!(
            affiliation,
            caller_affiliation = %caller_affiliation,
            "checking whether affiliation contains caller's affiliation"
        );

        if caller_affiliation.is_empty() {
            return Ok(true);
        }
        Ok(affiliation.starts_with(&caller_affiliation))
    }

    /// Fails unless the caller has authority over both the affiliation and
    /// the type of `user`.
    ///
    /// Both rejections use `NotAffiliated`, so the client cannot tell which
    /// check failed.
    ///
    /// # Errors
    ///
    /// `NotAffiliated`, or any error raised by the underlying checks
    /// (`RegistrarAttribute` for a caller that is not a registrar).
    pub async fn can_manage_user(&mut self, user: &dyn User) -> Result<(), ContextError> {
        let affiliation = user.affiliation_path().join(".");
        if !self.contains_affiliation(&affiliation).await? {
            return Err(ContextError::new(
                ErrorKind::NotAffiliated,
                format!("Caller does not have authority to act on affiliation '{affiliation}'"),
            ));
        }

        let user_type = user.user_type();
        if !self.can_act_on_type(user_type).await? {
            return Err(ContextError::new(
                ErrorKind::NotAffiliated,
                format!("Caller does not have authority to act on type '{user_type}'"),
            ));
        }
        Ok(())
    }
}
