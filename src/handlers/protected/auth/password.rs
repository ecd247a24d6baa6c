// handlers/protected/auth/password.rs - PATCH /api/auth/password handler

use axum::{extract::State, Extension};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::{hash_password_off_thread, verify_password_off_thread};
use crate::database::models::{AuditAction, EntityType};
use crate::error::ApiError;
use crate::handlers::public::auth::utils::MIN_PASSWORD_LENGTH;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, JsonBody, RequestMeta};
use crate::services::AuditEntry;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// PATCH /api/auth/password - change the caller's password
pub async fn password_patch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    meta: RequestMeta,
    JsonBody(body): JsonBody<PasswordRequest>,
) -> ApiResult<Value> {
    if body.new_password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::validation_error(
            "Validation failed",
            vec![format!("New password must be at least {} characters", MIN_PASSWORD_LENGTH)],
        ));
    }

    let user = state
        .store
        .get_user(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if !verify_password_off_thread(body.current_password, user.password_hash.clone()).await? {
        return Err(ApiError::bad_request("Current password is incorrect"));
    }

    let password_hash =
        hash_password_off_thread(body.new_password, state.config.security.password_hash_cost).await?;
    let changed = AuditEntry::new(AuditAction::PasswordUpdated, EntityType::User, user.id)
        .data(json!({ "passwordChanged": true }))
        .by(&meta.actor(&auth));
    state
        .store
        .update_user_password(user.id, &password_hash, Utc::now(), &changed)
        .await?;

    Ok(ApiResponse::success(json!({ "message": "Password updated successfully" })))
}
