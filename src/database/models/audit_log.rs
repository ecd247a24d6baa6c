use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

wire_enum! {
    AuditAction {
        TicketCreated => "TICKET_CREATED",
        StatusUpdated => "STATUS_UPDATED",
        PermitCreated => "PERMIT_CREATED",
        PermitUpdated => "PERMIT_UPDATED",
        PermitSubmitted => "PERMIT_SUBMITTED",
        PermitPrefillQueued => "PERMIT_PREFILL_QUEUED",
        TrafficPlanRequested => "TRAFFIC_PLAN_REQUESTED",
        InspectionRequested => "INSPECTION_REQUESTED",
        CloseoutSubmitted => "CLOSEOUT_SUBMITTED",
        UserCreated => "USER_CREATED",
        PasswordUpdated => "PASSWORD_UPDATED",
    }
}

wire_enum! {
    EntityType {
        Ticket => "TICKET",
        Permit => "PERMIT",
        User => "USER",
        Job => "JOB",
    }
}

/// One immutable entry in the audit trail. `user_id` is `None` for system actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: Uuid,
    pub ticket_id: Option<Uuid>,
    pub organization_id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub previous_data: Option<Value>,
    pub new_data: Value,
    pub timestamp: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}
