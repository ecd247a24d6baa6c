use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::database::models::{User, UserRole};

pub mod password;

pub use password::{
    hash_password, hash_password_off_thread, verify_password, verify_password_off_thread, DEFAULT_HASH_COST,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    pub organization_id: Uuid,
    pub role: UserRole,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn for_user(user: &User, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user.id,
            organization_id: user.organization_id,
            role: user.role,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("JWT secret not configured")]
    InvalidSecret,
    #[error("malformed password hash")]
    MalformedHash,
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

pub fn generate_jwt(claims: &Claims, security: &SecurityConfig) -> Result<String, AuthError> {
    if security.jwt_secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(security.jwt_secret.as_bytes());

    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

/// Verify signature and expiry, returning the embedded claims
pub fn validate_jwt(token: &str, security: &SecurityConfig) -> Result<Claims, AuthError> {
    if security.jwt_secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(security.jwt_secret.as_bytes());
    let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            email: "supervisor@example.com".to_string(),
            password_hash: String::new(),
            name: "Mike Rodriguez".to_string(),
            role: UserRole::FieldSupervisor,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn token_round_trip_preserves_identity() {
        let security = AppConfig::development().security;
        let user = user();
        let token = generate_jwt(&Claims::for_user(&user, 24), &security).unwrap();

        let claims = validate_jwt(&token, &security).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.organization_id, user.organization_id);
        assert_eq!(claims.role, UserRole::FieldSupervisor);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let mut security = AppConfig::development().security;
        let token = generate_jwt(&Claims::for_user(&user(), 1), &security).unwrap();

        security.jwt_secret = "rotated".to_string();
        assert!(matches!(
            validate_jwt(&token, &security),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let security = AppConfig::development().security;
        let mut claims = Claims::for_user(&user(), 1);
        claims.iat -= 7200;
        claims.exp -= 7200;
        let token = generate_jwt(&claims, &security).unwrap();

        assert!(validate_jwt(&token, &security).is_err());
    }
}
