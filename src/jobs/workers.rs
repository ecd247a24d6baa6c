// Placeholder workers: they decode the payload, log, and report success.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::payloads::{
    GenerateTrafficPlan, JobPayload, PrefillPermit, ProcessCloseout, ProcessTicket,
    ScheduleInspection,
};
use super::{JobError, JobRecord, QueueName, Worker};

pub struct PlaceholderWorker<P> {
    _payload: PhantomData<fn() -> P>,
}

impl<P: JobPayload> PlaceholderWorker<P> {
    pub fn new() -> Self {
        Self { _payload: PhantomData }
    }
}

impl<P: JobPayload> Default for PlaceholderWorker<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<P: JobPayload> Worker for PlaceholderWorker<P> {
    fn name(&self) -> &'static str {
        P::QUEUE.job_name()
    }

    fn queue(&self) -> QueueName {
        P::QUEUE
    }

    async fn run(&self, job: &JobRecord) -> Result<Value, JobError> {
        let payload: P = serde_json::from_value(job.payload.clone())?;
        let ticket_id = payload.ticket_id();

        tracing::info!(
            "{} job {} running for ticket {} (attempt {}/{})",
            job.name,
            job.id,
            ticket_id,
            job.attempts_made,
            job.max_attempts
        );

        let mut result = serde_json::Map::new();
        result.insert(P::OUTCOME.to_string(), Value::Bool(true));
        result.insert("ticketId".to_string(), json!(ticket_id));
        Ok(Value::Object(result))
    }
}

/// One placeholder worker per queue
pub fn default_workers() -> Vec<Arc<dyn Worker>> {
    vec![
        Arc::new(PlaceholderWorker::<ProcessTicket>::new()),
        Arc::new(PlaceholderWorker::<PrefillPermit>::new()),
        Arc::new(PlaceholderWorker::<GenerateTrafficPlan>::new()),
        Arc::new(PlaceholderWorker::<ScheduleInspection>::new()),
        Arc::new(PlaceholderWorker::<ProcessCloseout>::new()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobStatus;
    use chrono::Utc;
    use uuid::Uuid;

    fn record(queue: QueueName, payload: Value) -> JobRecord {
        JobRecord {
            id: Uuid::new_v4(),
            queue,
            name: queue.job_name().to_string(),
            organization_id: None,
            payload,
            status: JobStatus::Active,
            attempts_made: 1,
            max_attempts: 1,
            result: None,
            last_error: None,
            enqueued_at: Utc::now(),
            finished_at: None,
        }
    }

    #[tokio::test]
    async fn placeholder_reports_outcome_and_ticket() {
        let ticket_id = Uuid::new_v4();
        let worker = PlaceholderWorker::<GenerateTrafficPlan>::new();
        let job = record(
            QueueName::TrafficPlanGeneration,
            json!({ "ticketId": ticket_id, "templateId": "residential-street-v1" }),
        );

        let result = worker.run(&job).await.unwrap();
        assert_eq!(result, json!({ "generated": true, "ticketId": ticket_id }));
    }

    #[tokio::test]
    async fn malformed_payload_fails_the_attempt() {
        let worker = PlaceholderWorker::<ProcessCloseout>::new();
        let job = record(QueueName::CloseoutProcessing, json!({ "ticketId": "nope" }));
        assert!(matches!(worker.run(&job).await, Err(JobError::InvalidPayload(_))));
    }

    #[test]
    fn every_queue_has_a_default_worker() {
        let queues: Vec<QueueName> = default_workers().iter().map(|w| w.queue()).collect();
        for queue in QueueName::ALL {
            assert!(queues.contains(&queue));
        }
    }
}
