use async_trait::async_trait;
use serde_json::Value;

use super::{JobError, JobRecord, QueueName};

/// Consumer for one queue. A returned error or a timeout counts as a failed attempt.
#[async_trait]
pub trait Worker: Send + Sync {
    /// Worker name for logging
    fn name(&self) -> &'static str;

    fn queue(&self) -> QueueName;

    async fn run(&self, job: &JobRecord) -> Result<Value, JobError>;
}
