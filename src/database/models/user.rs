use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

wire_enum! {
    /// Roles gate every protected route
    UserRole {
        PermitCoordinator => "PERMIT_COORDINATOR",
        FieldSupervisor => "FIELD_SUPERVISOR",
        ComplianceManager => "COMPLIANCE_MANAGER",
    }
}

impl UserRole {
    pub fn display_name(&self) -> &'static str {
        match self {
            UserRole::PermitCoordinator => "Permit Coordinator",
            UserRole::FieldSupervisor => "Field Supervisor",
            UserRole::ComplianceManager => "Compliance Manager",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Actor details attached to audit entries
    pub fn actor(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "email": self.email,
            "role": self.role,
        })
    }
}
