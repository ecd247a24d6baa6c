use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

wire_enum! {
    EvidenceType {
        LocateProof => "LOCATE_PROOF",
        InspectionEvidence => "INSPECTION_EVIDENCE",
        AsBuilt => "AS_BUILT",
        CompliancePhoto => "COMPLIANCE_PHOTO",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub evidence_type: EvidenceType,
    pub title: String,
    pub description: Option<String>,
    pub file_path: String,
    pub file_type: String,
    pub file_size: i64,
    pub gps_latitude: Option<f64>,
    pub gps_longitude: Option<f64>,
    pub captured_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
