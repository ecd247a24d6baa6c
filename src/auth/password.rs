use super::AuthError;

/// Work factor applied when no configuration is at hand
pub const DEFAULT_HASH_COST: u32 = bcrypt::DEFAULT_COST;

/// Hash a password for storage with the given bcrypt work factor
pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    bcrypt::hash(password, cost).map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Verify a candidate password against a stored bcrypt hash
pub fn verify_password(password: &str, stored: &str) -> Result<bool, AuthError> {
    bcrypt::verify(password, stored).map_err(|_| AuthError::MalformedHash)
}

/// `hash_password` on the blocking pool, keeping request workers free
pub async fn hash_password_off_thread(password: String, cost: u32) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
}

/// `verify_password` on the blocking pool
pub async fn verify_password_off_thread(password: String, stored: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
}
