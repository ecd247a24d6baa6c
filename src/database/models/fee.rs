use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

wire_enum! {
    FeeStatus {
        Outstanding => "OUTSTANDING",
        Paid => "PAID",
        Waived => "WAIVED",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fee {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub organization_id: Uuid,
    #[serde(rename = "type")]
    pub fee_type: String,
    pub description: String,
    pub amount: Decimal,
    pub due_date: DateTime<Utc>,
    pub paid_date: Option<DateTime<Utc>>,
    pub paid_amount: Option<Decimal>,
    pub status: FeeStatus,
    pub reference_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
