use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

wire_enum! {
    InspectionStatus {
        Scheduled => "SCHEDULED",
        Completed => "COMPLETED",
        Cancelled => "CANCELLED",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inspection {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub permit_id: Option<Uuid>,
    pub organization_id: Uuid,
    pub inspection_type: String,
    pub scheduled_date: DateTime<Utc>,
    pub scheduled_time: String,
    pub inspector: String,
    pub inspector_contact: String,
    pub status: InspectionStatus,
    pub notes: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub calendar_event_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
