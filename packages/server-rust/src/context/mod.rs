//! Per-request security context.
//!
//! A [`RequestContext`] is created for every inbound request and owned by
//! the handler serving it. It lazily resolves, and then caches for the rest
//! of the request:
//!
//! 1. **Body** (`body`): the payload, drained from the transport at most once
//! 2. **CA** (`resolve`): the targeted CA, with its database initialized
//! 3. **Identity** (`auth`): basic or token authentication
//! 4. **Caller** (`caller`): the authenticated identity's registry record
//!
//! Authorization checks (`authz`) and attribute-extension construction
//! (`attrs`) build on those caches.

mod attrs;
mod auth;
mod authz;
mod body;
mod caller;
mod resolve;
mod revocation;

pub use authz::REGISTRAR_ROLES_ATTR;
pub use body::{BodySource, LimitedBody};

use std::sync::Arc;

use http::request::Parts;
use keyward_core::{AuthenticatedIdentity, Certificate, User};
use tracing::debug;

use crate::ca::{CaServer, CertificateAuthority};
use crate::error::{ContextError, ErrorKind};
use body::BodyState;

/// Authentication and authorization state bound to one request.
pub struct RequestContext {
    parts: Parts,
    body: BodyState,
    server: Arc<CaServer>,
    ca: Option<Arc<CertificateAuthority>>,
    identity: Option<AuthenticatedIdentity>,
    caller: Option<Arc<dyn User>>,
}

impl RequestContext {
    /// Creates a context over the request head and an unread body.
    #[must_use]
    pub fn new(parts: Parts, body: impl BodySource + 'static, server: Arc<CaServer>) -> Self {
        Self {
            parts,
            body: BodyState::Unread(Box::new(body)),
            server,
            ca: None,
            identity: None,
            caller: None,
        }
    }

    /// Creates a context from an axum request, reading at most
    /// `body_limit` bytes of payload.
    #[must_use]
    pub fn from_request(
        request: axum::extract::Request,
        server: Arc<CaServer>,
        body_limit: usize,
    ) -> Self {
        let (parts, body) = request.into_parts();
        Self::new(parts, LimitedBody::new(body, body_limit), server)
    }

    /// The request head.
    #[must_use]
    pub fn parts(&self) -> &Parts {
        &self.parts
    }

    /// The authenticated identity, once authentication has succeeded.
    #[must_use]
    pub fn identity(&self) -> Option<&AuthenticatedIdentity> {
        self.identity.as_ref()
    }

    /// The authenticated enrollment ID, once authentication has succeeded.
    #[must_use]
    pub fn enrollment_id(&self) -> Option<&str> {
        self.identity.as_ref().map(AuthenticatedIdentity::id)
    }

    /// The caller's enrollment certificate after token authentication.
    #[must_use]
    pub fn enrollment_cert(&self) -> Option<&Certificate> {
        self.identity
            .as_ref()
            .and_then(AuthenticatedIdentity::certificate)
    }

    /// Binds the identity established by an authentication scheme.
    ///
    /// The binding is write-once: re-authenticating as the same identity
    /// keeps the first binding, a different identity is refused.
    pub(crate) fn bind_identity(&mut self, identity: AuthenticatedIdentity) -> Result<(), ContextError> {
        match &self.identity {
            None => {
                debug!(
                    enrollment_id = %identity.id(),
                    scheme = identity.scheme(),
                    "bound request identity"
                );
                self.identity = Some(identity);
                Ok(())
            }
            Some(bound) if bound.id() == identity.id() => Ok(()),
            Some(bound) => Err(ContextError::new(
                ErrorKind::IdentityAlreadyBound,
                format!("Request is already authenticated as '{}'", bound.id()),
            )),
        }
    }
}
