use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

wire_enum! {
    PermitStatus {
        Draft => "DRAFT",
        Submitted => "SUBMITTED",
        PendingApproval => "PENDING_APPROVAL",
        Approved => "APPROVED",
        Rejected => "REJECTED",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permit {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub organization_id: Uuid,
    pub permit_number: Option<String>,
    pub municipality: String,
    pub permit_type: String,
    pub application_data: Value,
    pub prefilled_data: Value,
    pub fee: Decimal,
    pub status: PermitStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub pdf_path: Option<String>,
    pub xml_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
