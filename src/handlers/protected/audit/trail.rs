// handlers/protected/audit/trail.rs - GET /api/audit/:ticketId handler

use axum::{
    extract::{Path, State},
    Extension,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::middleware::{parse_uuid, ApiResponse, ApiResult, AuthUser, RoleGuard};

/// GET /api/audit/:ticketId - entries newest first, with the acting user
pub async fn trail_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(ticket_id): Path<String>,
) -> ApiResult<Value> {
    auth.require(RoleGuard::AnyRole)?;
    let ticket_id = parse_uuid(&ticket_id, "ticket id")?;

    let entries = state.audit().ticket_trail(auth.organization_id, ticket_id).await?;
    Ok(ApiResponse::success(json!({ "auditLogs": entries })))
}
