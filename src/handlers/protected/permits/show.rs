// handlers/protected/permits/show.rs - GET /api/permits/:id handler

use axum::{
    extract::{Path, State},
    Extension,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::middleware::{parse_uuid, ApiResponse, ApiResult, AuthUser, RoleGuard};

/// GET /api/permits/:id - permit with its full ticket
pub async fn show_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    auth.require(RoleGuard::AnyRole)?;
    let id = parse_uuid(&id, "permit id")?;
    let permit = state.permits().detail(auth.organization_id, id).await?;
    Ok(ApiResponse::success(json!({ "permit": permit })))
}
