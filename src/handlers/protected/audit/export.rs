// handlers/protected/audit/export.rs - GET /api/audit/:ticketId/export handler

use axum::{
    extract::{Path, State},
    Extension,
};
use serde_json::Value;

use crate::app::AppState;
use crate::middleware::{parse_uuid, ApiResponse, ApiResult, AuthUser, RoleGuard};

/// GET /api/audit/:ticketId/export - compliance package for one ticket
pub async fn export_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(ticket_id): Path<String>,
) -> ApiResult<Value> {
    auth.require(RoleGuard::ManagerOrCoordinator)?;
    let ticket_id = parse_uuid(&ticket_id, "ticket id")?;

    let package = state
        .audit()
        .export(auth.organization_id, ticket_id, &auth.name)
        .await?;

    tracing::info!("Compliance package for ticket {} exported by {}", ticket_id, auth.email);
    Ok(ApiResponse::success(package))
}
