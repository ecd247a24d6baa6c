use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::QueueName;

/// Typed body of a job on a specific queue
pub trait JobPayload: Serialize + DeserializeOwned + Send + Sync + 'static {
    const QUEUE: QueueName;
    /// Key set to `true` in a successful placeholder result
    const OUTCOME: &'static str;

    fn ticket_id(&self) -> Uuid;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessTicket {
    pub ticket_id: Uuid,
    pub organization_id: Uuid,
    pub raw_data: Value,
}

impl JobPayload for ProcessTicket {
    const QUEUE: QueueName = QueueName::TicketProcessing;
    const OUTCOME: &'static str = "processed";

    fn ticket_id(&self) -> Uuid {
        self.ticket_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefillPermit {
    pub ticket_id: Uuid,
    pub municipality: String,
    pub permit_type: String,
}

impl JobPayload for PrefillPermit {
    const QUEUE: QueueName = QueueName::PermitPrefill;
    const OUTCOME: &'static str = "prefilled";

    fn ticket_id(&self) -> Uuid {
        self.ticket_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTrafficPlan {
    pub ticket_id: Uuid,
    pub template_id: String,
}

impl JobPayload for GenerateTrafficPlan {
    const QUEUE: QueueName = QueueName::TrafficPlanGeneration;
    const OUTCOME: &'static str = "generated";

    fn ticket_id(&self) -> Uuid {
        self.ticket_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInspection {
    pub ticket_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permit_id: Option<Uuid>,
    pub inspection_type: String,
    pub preferred_date: String,
}

impl JobPayload for ScheduleInspection {
    const QUEUE: QueueName = QueueName::InspectionScheduling;
    const OUTCOME: &'static str = "scheduled";

    fn ticket_id(&self) -> Uuid {
        self.ticket_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessCloseout {
    pub ticket_id: Uuid,
    pub user_id: Uuid,
}

impl JobPayload for ProcessCloseout {
    const QUEUE: QueueName = QueueName::CloseoutProcessing;
    const OUTCOME: &'static str = "closed";

    fn ticket_id(&self) -> Uuid {
        self.ticket_id
    }
}
