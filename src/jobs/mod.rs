// Deferred work: five named queues drained in-process by registered workers.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub mod payloads;
pub mod queue;
pub mod worker;
pub mod workers;

pub use payloads::{
    GenerateTrafficPlan, JobPayload, PrefillPermit, ProcessCloseout, ProcessTicket,
    ScheduleInspection,
};
pub use queue::{JobQueue, JobQueueBuilder, QueueCounts};
pub use worker::Worker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueueName {
    TicketProcessing,
    PermitPrefill,
    TrafficPlanGeneration,
    InspectionScheduling,
    CloseoutProcessing,
}

impl QueueName {
    pub const ALL: [QueueName; 5] = [
        QueueName::TicketProcessing,
        QueueName::PermitPrefill,
        QueueName::TrafficPlanGeneration,
        QueueName::InspectionScheduling,
        QueueName::CloseoutProcessing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueName::TicketProcessing => "ticket-processing",
            QueueName::PermitPrefill => "permit-prefill",
            QueueName::TrafficPlanGeneration => "traffic-plan-generation",
            QueueName::InspectionScheduling => "inspection-scheduling",
            QueueName::CloseoutProcessing => "closeout-processing",
        }
    }

    /// Name given to every job placed on this queue
    pub fn job_name(&self) -> &'static str {
        match self {
            QueueName::TicketProcessing => "process-ticket",
            QueueName::PermitPrefill => "prefill-permit",
            QueueName::TrafficPlanGeneration => "generate-traffic-plan",
            QueueName::InspectionScheduling => "schedule-inspection",
            QueueName::CloseoutProcessing => "process-closeout",
        }
    }

    /// Default retry policy for the queue
    pub fn options(&self) -> JobOptions {
        match self {
            QueueName::TicketProcessing => JobOptions {
                attempts: 3,
                delay: Duration::ZERO,
                backoff: Backoff::Exponential(Duration::from_millis(2000)),
            },
            QueueName::PermitPrefill => JobOptions {
                attempts: 2,
                delay: Duration::from_millis(5000),
                backoff: Backoff::Fixed(Duration::from_millis(5000)),
            },
            QueueName::TrafficPlanGeneration
            | QueueName::InspectionScheduling
            | QueueName::CloseoutProcessing => JobOptions::once(),
        }
    }
}

impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QueueName {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QueueName::ALL
            .into_iter()
            .find(|q| q.as_str() == s)
            .ok_or_else(|| JobError::UnknownQueue(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    None,
    /// Same wait before every retry
    Fixed(Duration),
    /// `delay * 2^(attempt - 1)` after the given failed attempt
    Exponential(Duration),
}

impl Backoff {
    /// Wait before retrying after `attempt` (1-based) failed
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential(delay) => {
                let exponent = attempt.saturating_sub(1).min(16);
                delay.saturating_mul(1u32 << exponent)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobOptions {
    pub attempts: u32,
    /// Wait before the first attempt
    pub delay: Duration,
    pub backoff: Backoff,
}

impl JobOptions {
    /// Single attempt, no delay
    pub fn once() -> Self {
        Self {
            attempts: 1,
            delay: Duration::ZERO,
            backoff: Backoff::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Delayed,
    Waiting,
    Active,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Envelope tracked for every enqueued job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: Uuid,
    pub queue: QueueName,
    pub name: String,
    pub organization_id: Option<Uuid>,
    pub payload: Value,
    pub status: JobStatus,
    pub attempts_made: u32,
    pub max_attempts: u32,
    pub result: Option<Value>,
    pub last_error: Option<String>,
    pub enqueued_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("unknown queue '{0}'")]
    UnknownQueue(String),

    #[error("queue {0} is not accepting jobs")]
    QueueClosed(QueueName),

    #[error("job {0} already exists")]
    DuplicateId(Uuid),

    #[error("invalid job payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("{0}")]
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_backoff_doubles_per_attempt() {
        let backoff = Backoff::Exponential(Duration::from_millis(2000));
        assert_eq!(backoff.delay_for(1), Duration::from_millis(2000));
        assert_eq!(backoff.delay_for(2), Duration::from_millis(4000));
        assert_eq!(backoff.delay_for(3), Duration::from_millis(8000));
    }

    #[test]
    fn fixed_backoff_is_constant() {
        let backoff = Backoff::Fixed(Duration::from_millis(5000));
        assert_eq!(backoff.delay_for(1), backoff.delay_for(4));
    }

    #[test]
    fn queue_defaults_match_pipeline_policy() {
        let ticket = QueueName::TicketProcessing.options();
        assert_eq!(ticket.attempts, 3);
        assert_eq!(ticket.delay, Duration::ZERO);

        let prefill = QueueName::PermitPrefill.options();
        assert_eq!(prefill.attempts, 2);
        assert_eq!(prefill.delay, Duration::from_millis(5000));
        assert_eq!(prefill.backoff, Backoff::Fixed(Duration::from_millis(5000)));

        assert_eq!(QueueName::CloseoutProcessing.options().attempts, 1);
    }

    #[test]
    fn queue_names_parse_and_serialize() {
        let parsed: QueueName = "traffic-plan-generation".parse().unwrap();
        assert_eq!(parsed, QueueName::TrafficPlanGeneration);
        assert_eq!(parsed.job_name(), "generate-traffic-plan");
        assert_eq!(
            serde_json::to_value(QueueName::InspectionScheduling).unwrap(),
            serde_json::json!("inspection-scheduling")
        );
        assert!("unknown".parse::<QueueName>().is_err());
    }
}
