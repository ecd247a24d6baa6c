// handlers/protected/auth/register.rs - POST /api/auth/register handler

use axum::{extract::State, Extension};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::hash_password_off_thread;
use crate::database::models::{AuditAction, EntityType, User, UserRole};
use crate::error::ApiError;
use crate::handlers::public::auth::utils::{looks_like_email, MIN_PASSWORD_LENGTH};
use crate::middleware::{ApiResponse, ApiResult, AuthUser, JsonBody, RequestMeta, RoleGuard};
use crate::services::AuditEntry;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub organization_id: String,
}

/// POST /api/auth/register - create a user in the caller's organization (compliance managers)
///
/// Every field problem is reported at once as `400 VALIDATION_ERROR`.
pub async fn register_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    meta: RequestMeta,
    JsonBody(body): JsonBody<RegisterRequest>,
) -> ApiResult<User> {
    auth.require(RoleGuard::ComplianceManager)?;

    let email = body.email.trim().to_lowercase();
    let name = body.name.trim().to_string();
    let mut errors = Vec::new();
    if !looks_like_email(&email) {
        errors.push("A valid email is required".to_string());
    }
    if body.password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.push(format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH));
    }
    if name.is_empty() {
        errors.push("Name is required".to_string());
    }
    let role = body.role.parse::<UserRole>().ok();
    if role.is_none() {
        let roles: Vec<&str> = UserRole::ALL.iter().map(|r| r.as_str()).collect();
        errors.push(format!("Role must be one of {}", roles.join(", ")));
    }
    let organization_id = Uuid::parse_str(body.organization_id.trim()).ok();
    if organization_id.is_none() {
        errors.push("A valid organizationId is required".to_string());
    }

    let (Some(role), Some(organization_id), true) = (role, organization_id, errors.is_empty()) else {
        return Err(ApiError::validation_error("Validation failed", errors));
    };

    if state.store.get_organization(organization_id).await?.is_none() {
        return Err(ApiError::not_found("Organization not found"));
    }
    if organization_id != auth.organization_id {
        return Err(ApiError::forbidden("Cannot create users in another organization"));
    }

    let password_hash = hash_password_off_thread(body.password, state.config.security.password_hash_cost).await?;
    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        organization_id,
        email,
        password_hash,
        name,
        role,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    let created = AuditEntry::new(AuditAction::UserCreated, EntityType::User, user.id)
        .data(json!({ "email": user.email, "name": user.name, "role": user.role }))
        .by(&meta.actor(&auth));
    state.store.insert_user(&user, Some(&created)).await?;

    tracing::info!("User {} registered by {}", user.email, auth.email);
    Ok(ApiResponse::created(user))
}
