use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TrafficPlan {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub organization_id: Uuid,
    pub template_id: String,
    pub template_name: String,
    pub generated_data: Value,
    pub pdf_path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
