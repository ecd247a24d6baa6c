// handlers/protected/inspections/list.rs - GET /api/inspections handler

use axum::{
    extract::{Query, State},
    Extension,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::handlers::protected::utils::TicketFilter;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, RoleGuard};

pub async fn list_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(filter): Query<TicketFilter>,
) -> ApiResult<Value> {
    auth.require(RoleGuard::AnyRole)?;
    let inspections = state
        .store
        .list_inspections(auth.organization_id, filter.ticket_id()?)
        .await?;
    Ok(ApiResponse::success(json!({ "inspections": inspections })))
}
