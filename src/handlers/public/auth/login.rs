// handlers/public/auth/login.rs - POST /api/auth/login handler

use axum::extract::State;
use serde::Deserialize;
use serde_json::{json, Value};

use super::utils::user_profile;
use crate::app::AppState;
use crate::auth::{generate_jwt, verify_password_off_thread, Claims};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, JsonBody};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /api/auth/login - exchange credentials for a JWT
///
/// Expected Input:
/// ```json
/// { "email": "coordinator@austinutils.com", "password": "..." }
/// ```
///
/// Unknown email, inactive account and wrong password all answer
/// `401 Invalid credentials`.
pub async fn login_post(State(state): State<AppState>, JsonBody(body): JsonBody<LoginRequest>) -> ApiResult<Value> {
    let email = body.email.trim().to_lowercase();

    let user = match state.store.find_user_by_email(&email).await? {
        Some(user) if user.is_active => user,
        _ => {
            tracing::warn!("Login failed for {}", email);
            return Err(ApiError::unauthorized("Invalid credentials"));
        }
    };

    if !verify_password_off_thread(body.password, user.password_hash.clone()).await? {
        tracing::warn!("Login failed for {}: wrong password", email);
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let claims = Claims::for_user(&user, state.config.security.jwt_expiry_hours);
    let token = generate_jwt(&claims, &state.config.security)?;

    tracing::info!("User {} logged in", user.email);
    Ok(ApiResponse::success(json!({
        "token": token,
        "user": user_profile(&state, &user).await?,
    })))
}
