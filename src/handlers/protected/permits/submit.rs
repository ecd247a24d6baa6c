// handlers/protected/permits/submit.rs - POST /api/permits/:id/submit handler

use axum::{
    extract::{Path, State},
    Extension,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::middleware::{parse_uuid, ApiResponse, ApiResult, AuthUser, RequestMeta, RoleGuard};

/// POST /api/permits/:id/submit - mock municipal portal submission of a draft
///
/// Only DRAFT permits can be submitted; anything else answers `409`.
pub async fn submit_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    meta: RequestMeta,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    auth.require(RoleGuard::PermitCoordinator)?;
    let id = parse_uuid(&id, "permit id")?;

    let permit = state.permits().submit(&meta.actor(&auth), id).await?;
    Ok(ApiResponse::success(json!({
        "permit": permit,
        "message": "Permit submitted successfully",
    })))
}
