// handlers/protected/auth/me.rs - GET /api/auth/me handler

use axum::{extract::State, Extension};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::handlers::public::auth::utils::user_profile;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// GET /api/auth/me - current user with organization summary
pub async fn me_get(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> ApiResult<Value> {
    let user = state
        .store
        .get_user(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(ApiResponse::success(json!({ "user": user_profile(&state, &user).await? })))
}
