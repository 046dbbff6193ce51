//! Identity lookup handler.

use axum::extract::{Path, Request, State};
use axum::Json;
use serde_json::{json, Value};
use tracing::debug;

use super::{success, AppState};
use crate::error::{ContextError, ErrorKind};

/// `GET /api/v1/identities/{id}` -- returns an identity the caller has
/// authority over.
///
/// # Errors
///
/// Any authentication failure, `IdentityNotFound` if the registry does not
/// know `id`, or `NotAffiliated`/`RegistrarAttribute` if the caller may not
/// manage it.
pub async fn get_identity_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<Value>, ContextError> {
    let mut ctx = state.context(request);
    ctx.token_authentication().await?;

    let ca = ctx.ca().await?;
    let user = ca.registry().get_user(&id).await.map_err(|err| {
        ContextError::wrap(
            ErrorKind::IdentityNotFound,
            format!("Failed to get identity '{id}'"),
            err,
        )
    })?;
    ctx.can_manage_user(user.as_ref()).await?;

    let attrs = user.attributes(None).unwrap_or_else(|err| {
        debug!(identity = %id, error = %err, "failed to list identity attributes");
        Vec::new()
    });
    Ok(success(json!({
        "id": user.name(),
        "type": user.user_type(),
        "affiliation": user.affiliation_path().join("."),
        "attrs": attrs,
        "caname": ca.name(),
    })))
}
