// handlers/protected/tickets/dashboard.rs - GET /api/tickets/dashboard/summary handler

use axum::{extract::State, Extension};
use serde_json::Value;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, RoleGuard};

/// GET /api/tickets/dashboard/summary - workload counters and recent tickets
pub async fn dashboard_get(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> ApiResult<Value> {
    auth.require(RoleGuard::AnyRole)?;
    let summary = state.dashboard().summary(auth.organization_id).await?;
    Ok(ApiResponse::success(summary))
}
