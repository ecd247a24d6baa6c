// handlers/protected/evidence/list.rs - GET /api/evidence handler

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
    let evidence = state
        .store
        .list_evidence(auth.organization_id, filter.ticket_id()?)
        .await?;
    Ok(ApiResponse::success(json!({ "evidence": evidence })))
}
