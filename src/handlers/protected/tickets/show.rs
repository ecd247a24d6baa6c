// handlers/protected/tickets/show.rs - GET /api/tickets/:id handler

use axum::{
    extract::{Path, State},
    Extension,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::middleware::{parse_uuid, ApiResponse, ApiResult, AuthUser, RoleGuard};

/// GET /api/tickets/:id - ticket with all related records
pub async fn show_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    auth.require(RoleGuard::AnyRole)?;
    let id = parse_uuid(&id, "ticket id")?;

    let ticket = state.tickets().detail(auth.organization_id, id).await?;
    Ok(ApiResponse::success(json!({ "ticket": ticket })))
}
