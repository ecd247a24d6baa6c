// handlers/protected/audit/summary.rs - GET /api/audit/organization/summary handler

use axum::{extract::State, Extension};
use serde_json::Value;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, RoleGuard};

pub async fn summary_get(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> ApiResult<Value> {
    auth.require(RoleGuard::ComplianceManager)?;
    let summary = state.audit().organization_summary(auth.organization_id).await?;
    Ok(ApiResponse::success(summary))
}
