// handlers/protected/traffic_plans/list.rs - GET /api/traffic-plans handler

use axum::{
    extract::{Query, State},
    Extension,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::handlers::protected::utils::TicketFilter;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, RoleGuard};

/// GET /api/traffic-plans?ticketId=
pub async fn list_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(filter): Query<TicketFilter>,
) -> ApiResult<Value> {
    auth.require(RoleGuard::AnyRole)?;
    let plans = state
        .store
        .list_traffic_plans(auth.organization_id, filter.ticket_id()?)
        .await?;
    Ok(ApiResponse::success(json!({ "trafficPlans": plans })))
}
