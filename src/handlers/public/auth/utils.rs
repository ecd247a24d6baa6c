// handlers/public/auth/utils.rs - shapes shared by the auth handlers

use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::User;
use crate::error::ApiError;

pub const MIN_PASSWORD_LENGTH: usize = 8;

pub fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.starts_with('.') && domain.contains('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

/// User as returned by login and `me`, with its organization summary
pub async fn user_profile(state: &AppState, user: &User) -> Result<Value, ApiError> {
    let organization = state
        .store
        .get_organization(user.organization_id)
        .await?
        .map(|o| o.summary());

    Ok(json!({
        "id": user.id,
        "email": user.email,
        "name": user.name,
        "role": user.role,
        "organizationId": user.organization_id,
        "organization": organization,
    }))
}
