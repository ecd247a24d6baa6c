// handlers/protected/permits/list.rs - GET /api/permits handler

use axum::{extract::State, Extension};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, RoleGuard};

pub async fn list_get(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> ApiResult<Value> {
    auth.require(RoleGuard::AnyRole)?;
    let permits = state.permits().list(auth.organization_id).await?;
    Ok(ApiResponse::success(json!({ "permits": permits })))
}
