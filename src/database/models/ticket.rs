use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

wire_enum! {
    /// Ticket lifecycle. Order is advisory: any status may be set from any other.
    TicketStatus {
        Intake => "INTAKE",
        PermitFiled => "PERMIT_FILED",
        InspectionScheduled => "INSPECTION_SCHEDULED",
        FieldWork => "FIELD_WORK",
        InspectionPending => "INSPECTION_PENDING",
        Closed => "CLOSED",
    }
}

impl TicketStatus {
    /// Statuses counted as pending work on the dashboard
    pub const PENDING: &'static [TicketStatus] = &[TicketStatus::Intake, TicketStatus::PermitFiled];
}

wire_enum! {
    UtilityType {
        Electric => "ELECTRIC",
        Gas => "GAS",
        Water => "WATER",
        Sewer => "SEWER",
        Telecom => "TELECOM",
        Cable => "CABLE",
        Fiber => "FIBER",
    }
}

impl UtilityType {
    /// Utilities whose excavation needs a traffic control plan
    pub fn requires_traffic_control(&self) -> bool {
        matches!(self, UtilityType::Electric | UtilityType::Gas | UtilityType::Fiber)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub ticket_number: String,
    pub source: String,
    pub status: TicketStatus,
    pub excavator_name: String,
    pub excavator_phone: String,
    pub excavator_email: Option<String>,
    pub work_address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub utility_types: Vec<UtilityType>,
    pub work_start_date: DateTime<Utc>,
    pub work_end_date: DateTime<Utc>,
    pub work_description: String,
    pub emergency_contact: Option<String>,
    pub raw_data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Fields carried alongside permits in list responses
    pub fn reference(&self) -> Value {
        serde_json::json!({
            "ticketNumber": self.ticket_number,
            "workAddress": self.work_address,
            "excavatorName": self.excavator_name,
        })
    }
}
