use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use serde_json::json;
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::validate_jwt;
use crate::database::models::UserRole;
use crate::error::ApiError;

/// Authenticated user context, loaded from the store after the JWT checks out
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
}

/// Role requirements for a route
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoleGuard {
    PermitCoordinator,
    FieldSupervisor,
    ComplianceManager,
    AnyRole,
    ManagerOrCoordinator,
}

impl RoleGuard {
    pub fn allowed(&self) -> &'static [UserRole] {
        match self {
            RoleGuard::PermitCoordinator => &[UserRole::PermitCoordinator],
            RoleGuard::FieldSupervisor => &[UserRole::FieldSupervisor],
            RoleGuard::ComplianceManager => &[UserRole::ComplianceManager],
            RoleGuard::AnyRole => UserRole::ALL,
            RoleGuard::ManagerOrCoordinator => &[UserRole::ComplianceManager, UserRole::PermitCoordinator],
        }
    }
}

impl AuthUser {
    /// 403 with the required and current roles unless this user passes `guard`
    pub fn require(&self, guard: RoleGuard) -> Result<(), ApiError> {
        let allowed = guard.allowed();
        if allowed.contains(&self.role) {
            return Ok(());
        }

        tracing::warn!(
            "User {} with role {} denied; requires {:?}",
            self.email,
            self.role,
            guard
        );
        let required: Vec<&str> = allowed.iter().map(|r| r.as_str()).collect();
        Err(ApiError::insufficient_permissions(&required, self.role.as_str()))
    }

    pub fn summary(&self) -> serde_json::Value {
        json!({
            "id": self.user_id,
            "email": self.email,
            "name": self.name,
            "role": self.role,
            "organizationId": self.organization_id,
        })
    }
}

/// JWT authentication middleware: validates the bearer token, then confirms the
/// user still exists and is active before handing an `AuthUser` to handlers
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_jwt_from_headers(&headers).ok_or_else(|| ApiError::unauthorized("No token provided"))?;

    let claims = validate_jwt(token, &state.config.security)?;

    let user = state
        .store
        .get_user(claims.sub)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| {
            tracing::warn!("Token for user {} rejected: user missing or inactive", claims.sub);
            ApiError::unauthorized("Invalid or inactive user")
        })?;

    request.extensions_mut().insert(AuthUser {
        user_id: user.id,
        organization_id: user.organization_id,
        email: user.email,
        name: user.name,
        role: user.role,
    });

    Ok(next.run(request).await)
}

/// Bearer token from the Authorization header, if any
fn extract_jwt_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue, StatusCode};

    fn user(role: UserRole) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            email: "someone@example.com".to_string(),
            name: "Someone".to_string(),
            role,
        }
    }

    #[test]
    fn guards_admit_expected_roles() {
        assert!(user(UserRole::PermitCoordinator).require(RoleGuard::ManagerOrCoordinator).is_ok());
        assert!(user(UserRole::ComplianceManager).require(RoleGuard::ManagerOrCoordinator).is_ok());
        assert!(user(UserRole::FieldSupervisor).require(RoleGuard::AnyRole).is_ok());
        assert!(user(UserRole::FieldSupervisor).require(RoleGuard::FieldSupervisor).is_ok());
    }

    #[test]
    fn rejection_lists_required_and_current() {
        let err = user(UserRole::FieldSupervisor)
            .require(RoleGuard::ManagerOrCoordinator)
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        let body = err.to_json();
        assert_eq!(body["error"], "Insufficient permissions");
        assert_eq!(body["details"]["current"], "FIELD_SUPERVISOR");
        assert_eq!(
            body["details"]["required"],
            json!(["COMPLIANCE_MANAGER", "PERMIT_COORDINATOR"])
        );
    }

    #[test]
    fn bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_jwt_from_headers(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_jwt_from_headers(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_jwt_from_headers(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_jwt_from_headers(&headers), Some("abc.def.ghi"));
    }
}
