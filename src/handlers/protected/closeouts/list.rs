// handlers/protected/closeouts/list.rs - GET /api/closeouts handler

use axum::{extract::State, Extension};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::jobs::QueueName;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, RoleGuard};

/// GET /api/closeouts - closeout jobs of the caller's organization, newest first
pub async fn list_get(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> ApiResult<Value> {
    auth.require(RoleGuard::AnyRole)?;
    let closeouts = state
        .jobs
        .list(Some(QueueName::CloseoutProcessing), Some(auth.organization_id))
        .await;
    Ok(ApiResponse::success(json!({ "closeouts": closeouts })))
}
