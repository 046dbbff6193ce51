//! Enrollment and re-enrollment handlers.
//!
//! Both authenticate the caller, build the attribute extension from the
//! caller's registered attributes, and hand the CSR to the targeted CA's
//! signer. They differ only in the credential accepted: a password for
//! enrollment, a token signed by the current certificate for re-enrollment.

use axum::extract::{Request, State};
use axum::Json;
use keyward_core::{AttributeRequest, SignRequest};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::{success, AppState};
use crate::context::RequestContext;
use crate::error::{ContextError, ErrorKind};

/// Body of an enrollment or re-enrollment request.
#[derive(Debug, Deserialize)]
pub struct EnrollmentRequest {
    /// Targeted CA; read by the CA resolver, not by the handler.
    #[serde(default)]
    pub caname: Option<String>,
    /// PEM-encoded CSR.
    pub certificate_request: String,
    #[serde(default)]
    pub profile: String,
    /// Explicit attribute requests; `None` selects the caller's defaults.
    #[serde(default)]
    pub attr_reqs: Option<Vec<AttributeRequest>>,
}

/// `POST /api/v1/enroll` -- password-authenticated enrollment.
///
/// # Errors
///
/// Any authentication, body, attribute or signing failure, rendered with
/// its status class.
pub async fn enroll_handler(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<Value>, ContextError> {
    let mut ctx = state.context(request);
    ctx.basic_authentication().await?;
    issue(&mut ctx).await
}

/// `POST /api/v1/reenroll` -- token-authenticated re-enrollment.
///
/// # Errors
///
/// Any authentication, body, attribute or signing failure, rendered with
/// its status class.
pub async fn reenroll_handler(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<Value>, ContextError> {
    let mut ctx = state.context(request);
    ctx.token_authentication().await?;
    issue(&mut ctx).await
}

async fn issue(ctx: &mut RequestContext) -> Result<Json<Value>, ContextError> {
    let body: EnrollmentRequest = ctx.read_body().await?;
    let extension = ctx.attr_extension(body.attr_reqs, &body.profile).await?;
    let ca = ctx.ca().await?;
    let enrollment_id = ctx
        .enrollment_id()
        .ok_or_else(|| ContextError::new(ErrorKind::NotAuthenticated, "Caller is not authenticated"))?
        .to_string();

    let pem = ca
        .signer()
        .sign(SignRequest {
            enrollment_id: enrollment_id.clone(),
            certificate_request: body.certificate_request,
            profile: body.profile,
            extensions: extension.into_iter().collect(),
        })
        .await
        .map_err(|err| ContextError::wrap(ErrorKind::Signing, "Certificate signing failure", err))?;

    info!(ca = %ca.name(), enrollment_id = %enrollment_id, "issued certificate");
    Ok(success(json!({ "cert": pem })))
}
