// handlers/protected/permits/update.rs - PATCH /api/permits/:id handler

use axum::{
    extract::{Path, State},
    Extension,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::middleware::{parse_uuid, ApiResponse, ApiResult, AuthUser, JsonBody, RequestMeta, RoleGuard};

/// PATCH /api/permits/:id - shallow-merge the body into the application data
pub async fn update_patch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    meta: RequestMeta,
    Path(id): Path<String>,
    JsonBody(changes): JsonBody<Value>,
) -> ApiResult<Value> {
    auth.require(RoleGuard::PermitCoordinator)?;
    let id = parse_uuid(&id, "permit id")?;

    let permit = state
        .permits()
        .update_application(&meta.actor(&auth), id, changes)
        .await?;
    Ok(ApiResponse::success(json!({ "permit": permit })))
}
