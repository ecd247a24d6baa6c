// handlers/protected/tickets/status.rs - PATCH /api/tickets/:id/status handler

use axum::{
    extract::{Path, State},
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::TicketStatus;
use crate::middleware::{parse_uuid, ApiResponse, ApiResult, AuthUser, JsonBody, RequestMeta, RoleGuard};

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

/// PATCH /api/tickets/:id/status - set any lifecycle status
pub async fn status_patch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    meta: RequestMeta,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<StatusRequest>,
) -> ApiResult<Value> {
    auth.require(RoleGuard::ManagerOrCoordinator)?;
    let id = parse_uuid(&id, "ticket id")?;
    let status: TicketStatus = body.status.parse()?;

    let ticket = state
        .tickets()
        .update_status(&meta.actor(&auth), id, status)
        .await?;
    Ok(ApiResponse::success(json!({ "ticket": ticket })))
}
