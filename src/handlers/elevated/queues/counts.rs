// handlers/elevated/queues/counts.rs - GET /admin/queues handler

use axum::{extract::State, Extension};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, RoleGuard};

/// GET /admin/queues - job counts by status for every queue
pub async fn counts_get(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> ApiResult<Value> {
    auth.require(RoleGuard::ComplianceManager)?;
    let counts = state.jobs.counts(Some(auth.organization_id)).await;
    Ok(ApiResponse::success(json!({ "queues": counts })))
}
