use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{mpsc, RwLock, Semaphore};
use tokio::time::{sleep, timeout};
use uuid::Uuid;

use super::{JobError, JobOptions, JobPayload, JobRecord, JobStatus, QueueName, Worker};
use crate::config::QueueConfig;

/// Per-status job counts for one queue
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueCounts {
    pub queue: String,
    pub delayed: u64,
    pub waiting: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
}

struct Inner {
    senders: HashMap<QueueName, mpsc::UnboundedSender<Uuid>>,
    options: HashMap<QueueName, JobOptions>,
    retain_finished: usize,
    jobs: RwLock<HashMap<Uuid, JobRecord>>,
}

/// In-process queue set. Cloning shares the same queues and job registry.
#[derive(Clone)]
pub struct JobQueue {
    inner: Arc<Inner>,
}

pub struct JobQueueBuilder {
    concurrency: usize,
    job_timeout: Duration,
    retain_finished: usize,
    workers: Vec<Arc<dyn Worker>>,
    options: HashMap<QueueName, JobOptions>,
}

impl JobQueueBuilder {
    pub fn worker(mut self, worker: Arc<dyn Worker>) -> Self {
        self.workers.push(worker);
        self
    }

    pub fn workers(mut self, workers: impl IntoIterator<Item = Arc<dyn Worker>>) -> Self {
        self.workers.extend(workers);
        self
    }

    /// Replace the default retry policy of a queue
    pub fn options(mut self, queue: QueueName, options: JobOptions) -> Self {
        self.options.insert(queue, options);
        self
    }

    /// Spawn one dispatcher per queue that has a worker. Must run inside a tokio runtime.
    pub fn start(self) -> JobQueue {
        let mut senders = HashMap::new();
        let mut receivers = Vec::new();

        for worker in self.workers {
            let queue = worker.queue();
            if senders.contains_key(&queue) {
                tracing::warn!("Ignoring second worker '{}' for queue {}", worker.name(), queue);
                continue;
            }
            let (tx, rx) = mpsc::unbounded_channel();
            senders.insert(queue, tx);
            receivers.push((worker, rx));
        }

        let queue = JobQueue {
            inner: Arc::new(Inner {
                senders,
                options: self.options,
                retain_finished: self.retain_finished,
                jobs: RwLock::new(HashMap::new()),
            }),
        };

        for (worker, rx) in receivers {
            let dispatcher = Dispatcher {
                queue: queue.clone(),
                worker,
                permits: Arc::new(Semaphore::new(self.concurrency.max(1))),
                job_timeout: self.job_timeout,
            };
            tracing::debug!("Starting dispatcher for queue {}", dispatcher.worker.queue());
            tokio::spawn(dispatcher.run(rx));
        }

        queue
    }
}

impl JobQueue {
    pub fn builder(config: &QueueConfig) -> JobQueueBuilder {
        JobQueueBuilder {
            concurrency: config.concurrency,
            job_timeout: Duration::from_secs(config.job_timeout_secs),
            retain_finished: config.retain_finished,
            workers: Vec::new(),
            options: QueueName::ALL.into_iter().map(|q| (q, q.options())).collect(),
        }
    }

    fn options_for(&self, queue: QueueName) -> JobOptions {
        self.inner
            .options
            .get(&queue)
            .copied()
            .unwrap_or_else(|| queue.options())
    }

    /// Record the job and hand it to its queue's dispatcher
    pub async fn enqueue<P: JobPayload>(
        &self,
        organization_id: Option<Uuid>,
        payload: &P,
    ) -> Result<JobRecord, JobError> {
        self.enqueue_with_id(Uuid::new_v4(), organization_id, payload).await
    }

    /// `enqueue` under an id the caller chose beforehand, so the id can be
    /// referenced before the job exists
    pub async fn enqueue_with_id<P: JobPayload>(
        &self,
        id: Uuid,
        organization_id: Option<Uuid>,
        payload: &P,
    ) -> Result<JobRecord, JobError> {
        let queue = P::QUEUE;
        let sender = self
            .inner
            .senders
            .get(&queue)
            .ok_or(JobError::QueueClosed(queue))?;
        let options = self.options_for(queue);

        let record = JobRecord {
            id,
            queue,
            name: queue.job_name().to_string(),
            organization_id,
            payload: serde_json::to_value(payload)?,
            status: if options.delay.is_zero() {
                JobStatus::Waiting
            } else {
                JobStatus::Delayed
            },
            attempts_made: 0,
            max_attempts: options.attempts.max(1),
            result: None,
            last_error: None,
            enqueued_at: Utc::now(),
            finished_at: None,
        };

        {
            let mut jobs = self.inner.jobs.write().await;
            if jobs.contains_key(&id) {
                return Err(JobError::DuplicateId(id));
            }
            jobs.insert(id, record.clone());
        }

        if sender.send(record.id).is_err() {
            self.inner.jobs.write().await.remove(&record.id);
            return Err(JobError::QueueClosed(queue));
        }

        tracing::info!("Queued {} job {} on {}", record.name, record.id, queue);
        Ok(record)
    }

    pub async fn get(&self, id: Uuid) -> Option<JobRecord> {
        self.inner.jobs.read().await.get(&id).cloned()
    }

    /// Jobs newest first, optionally narrowed by queue and organization
    pub async fn list(&self, queue: Option<QueueName>, organization_id: Option<Uuid>) -> Vec<JobRecord> {
        let jobs = self.inner.jobs.read().await;
        let mut matched: Vec<JobRecord> = jobs
            .values()
            .filter(|job| queue.map_or(true, |q| job.queue == q))
            .filter(|job| organization_id.map_or(true, |org| job.organization_id == Some(org)))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.enqueued_at.cmp(&a.enqueued_at));
        matched
    }

    /// Per-queue counts, optionally narrowed to one organization's jobs
    pub async fn counts(&self, organization_id: Option<Uuid>) -> Vec<QueueCounts> {
        let jobs = self.inner.jobs.read().await;
        QueueName::ALL
            .into_iter()
            .map(|queue| {
                let mut counts = QueueCounts {
                    queue: queue.as_str().to_string(),
                    ..Default::default()
                };
                let in_scope = jobs.values().filter(|job| {
                    job.queue == queue
                        && organization_id.map_or(true, |org| job.organization_id == Some(org))
                });
                for job in in_scope {
                    match job.status {
                        JobStatus::Delayed => counts.delayed += 1,
                        JobStatus::Waiting => counts.waiting += 1,
                        JobStatus::Active => counts.active += 1,
                        JobStatus::Completed => counts.completed += 1,
                        JobStatus::Failed => counts.failed += 1,
                    }
                }
                counts
            })
            .collect()
    }

    /// Poll until the job finishes or `limit` elapses, returning its last known state
    pub async fn wait(&self, id: Uuid, limit: Duration) -> Option<JobRecord> {
        let deadline = tokio::time::Instant::now() + limit;
        loop {
            let job = self.get(id).await?;
            if job.status.is_finished() || tokio::time::Instant::now() >= deadline {
                return Some(job);
            }
            sleep(Duration::from_millis(10)).await;
        }
    }

    /// Apply the final state of a job, then drop the oldest finished jobs of
    /// its queue beyond the retention limit
    async fn finish<F: FnOnce(&mut JobRecord)>(&self, id: Uuid, f: F) {
        let mut jobs = self.inner.jobs.write().await;
        let Some(job) = jobs.get_mut(&id) else {
            return;
        };
        f(job);
        let queue = job.queue;

        let mut finished: Vec<(chrono::DateTime<Utc>, Uuid)> = jobs
            .values()
            .filter(|job| job.queue == queue && job.status.is_finished())
            .map(|job| (job.finished_at.unwrap_or(job.enqueued_at), job.id))
            .collect();
        if finished.len() <= self.inner.retain_finished {
            return;
        }

        finished.sort();
        let excess = finished.len() - self.inner.retain_finished;
        for (_, stale) in finished.into_iter().take(excess) {
            jobs.remove(&stale);
        }
        tracing::debug!("Pruned {} finished jobs from {}", excess, queue);
    }

    async fn update<F: FnOnce(&mut JobRecord)>(&self, id: Uuid, f: F) -> Option<JobRecord> {
        let mut jobs = self.inner.jobs.write().await;
        let job = jobs.get_mut(&id)?;
        f(job);
        Some(job.clone())
    }
}

struct Dispatcher {
    queue: JobQueue,
    worker: Arc<dyn Worker>,
    permits: Arc<Semaphore>,
    job_timeout: Duration,
}

impl Dispatcher {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<Uuid>) {
        let this = Arc::new(self);
        while let Some(id) = rx.recv().await {
            let dispatcher = this.clone();
            tokio::spawn(async move { dispatcher.process(id).await });
        }
        tracing::debug!("Dispatcher for queue {} stopped", this.worker.queue());
    }

    async fn process(&self, id: Uuid) {
        let options = self.queue.options_for(self.worker.queue());

        if !options.delay.is_zero() {
            sleep(options.delay).await;
            self.queue.update(id, |job| job.status = JobStatus::Waiting).await;
        }

        loop {
            let Ok(permit) = self.permits.acquire().await else {
                return;
            };

            let Some(job) = self
                .queue
                .update(id, |job| {
                    job.status = JobStatus::Active;
                    job.attempts_made += 1;
                })
                .await
            else {
                return;
            };

            let outcome = match timeout(self.job_timeout, self.worker.run(&job)).await {
                Ok(result) => result,
                Err(_elapsed) => Err(JobError::Failed(format!(
                    "job timed out after {:?}",
                    self.job_timeout
                ))),
            };

            match outcome {
                Ok(result) => {
                    self.queue
                        .finish(id, |job| {
                            job.status = JobStatus::Completed;
                            job.result = Some(result);
                            job.last_error = None;
                            job.finished_at = Some(Utc::now());
                        })
                        .await;
                    tracing::info!("Job {} ({}) completed", id, job.name);
                    return;
                }
                Err(err) if job.attempts_made < job.max_attempts => {
                    let wait = options.backoff.delay_for(job.attempts_made);
                    tracing::warn!(
                        "Job {} ({}) attempt {}/{} failed: {}; retrying in {:?}",
                        id,
                        job.name,
                        job.attempts_made,
                        job.max_attempts,
                        err,
                        wait
                    );
                    self.queue
                        .update(id, |job| {
                            job.status = JobStatus::Delayed;
                            job.last_error = Some(err.to_string());
                        })
                        .await;
                    drop(permit);
                    sleep(wait).await;
                    self.queue.update(id, |job| job.status = JobStatus::Waiting).await;
                }
                Err(err) => {
                    tracing::error!(
                        "Job {} ({}) failed after {} attempts: {}",
                        id,
                        job.name,
                        job.attempts_made,
                        err
                    );
                    self.queue
                        .finish(id, |job| {
                            job.status = JobStatus::Failed;
                            job.last_error = Some(err.to_string());
                            job.finished_at = Some(Utc::now());
                        })
                        .await;
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::jobs::{Backoff, GenerateTrafficPlan, ProcessTicket};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

    /// Fails until it has been called `succeed_on` times
    struct Flaky {
        calls: AtomicU32,
        succeed_on: u32,
    }

    #[async_trait]
    impl Worker for Flaky {
        fn name(&self) -> &'static str {
            "flaky"
        }

        fn queue(&self) -> QueueName {
            QueueName::TicketProcessing
        }

        async fn run(&self, _job: &JobRecord) -> Result<Value, JobError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call >= self.succeed_on {
                Ok(json!({ "call": call }))
            } else {
                Err(JobError::Failed(format!("call {} failed", call)))
            }
        }
    }

    struct Sleepy;

    #[async_trait]
    impl Worker for Sleepy {
        fn name(&self) -> &'static str {
            "sleepy"
        }

        fn queue(&self) -> QueueName {
            QueueName::TrafficPlanGeneration
        }

        async fn run(&self, _job: &JobRecord) -> Result<Value, JobError> {
            sleep(Duration::from_secs(5)).await;
            Ok(Value::Null)
        }
    }

    /// Holds every run until released, tracking how many run at once
    struct Gated {
        release: Semaphore,
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Gated {
        fn new() -> Self {
            Self {
                release: Semaphore::new(0),
                running: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Worker for Gated {
        fn name(&self) -> &'static str {
            "gated"
        }

        fn queue(&self) -> QueueName {
            QueueName::TicketProcessing
        }

        async fn run(&self, _job: &JobRecord) -> Result<Value, JobError> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let held = self.release.acquire().await.map_err(|e| JobError::Failed(e.to_string()));
            self.running.fetch_sub(1, Ordering::SeqCst);
            held?.forget();
            Ok(Value::Null)
        }
    }

    fn ticket_counts(counts: &[QueueCounts]) -> QueueCounts {
        counts
            .iter()
            .find(|c| c.queue == "ticket-processing")
            .cloned()
            .unwrap()
    }

    /// Poll the queue counts until `ready` holds, panicking after two seconds
    async fn counts_until(queue: &JobQueue, ready: impl Fn(&QueueCounts) -> bool) -> QueueCounts {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let counts = ticket_counts(&queue.counts(None).await);
            if ready(&counts) {
                return counts;
            }
            assert!(tokio::time::Instant::now() < deadline, "counts never settled: {:?}", counts);
            sleep(Duration::from_millis(5)).await;
        }
    }

    fn fast_retries(attempts: u32) -> JobOptions {
        JobOptions {
            attempts,
            delay: Duration::ZERO,
            backoff: Backoff::Exponential(Duration::from_millis(5)),
        }
    }

    fn ticket_payload() -> ProcessTicket {
        ProcessTicket {
            ticket_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            raw_data: json!({}),
        }
    }

    #[tokio::test]
    async fn retries_until_success() {
        let queue = JobQueue::builder(&AppConfig::development().queue)
            .worker(Arc::new(Flaky { calls: AtomicU32::new(0), succeed_on: 3 }))
            .options(QueueName::TicketProcessing, fast_retries(3))
            .start();

        let job = queue.enqueue(None, &ticket_payload()).await.unwrap();
        assert_eq!(job.status, JobStatus::Waiting);

        let done = queue.wait(job.id, Duration::from_secs(2)).await.unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.attempts_made, 3);
        assert_eq!(done.result, Some(json!({ "call": 3 })));
        assert!(done.last_error.is_none());
    }

    #[tokio::test]
    async fn exhausted_attempts_mark_job_failed() {
        let queue = JobQueue::builder(&AppConfig::development().queue)
            .worker(Arc::new(Flaky { calls: AtomicU32::new(0), succeed_on: 10 }))
            .options(QueueName::TicketProcessing, fast_retries(2))
            .start();

        let job = queue.enqueue(None, &ticket_payload()).await.unwrap();
        let done = queue.wait(job.id, Duration::from_secs(2)).await.unwrap();
        assert_eq!(done.status, JobStatus::Failed);
        assert_eq!(done.attempts_made, 2);
        assert_eq!(done.last_error.as_deref(), Some("call 2 failed"));
        assert!(done.finished_at.is_some());
    }

    #[tokio::test]
    async fn timeout_counts_as_failure() {
        let mut config = AppConfig::development().queue;
        config.job_timeout_secs = 0;
        let queue = JobQueue::builder(&config).worker(Arc::new(Sleepy)).start();

        let payload = GenerateTrafficPlan {
            ticket_id: Uuid::new_v4(),
            template_id: "residential-street-v1".to_string(),
        };
        let job = queue.enqueue(None, &payload).await.unwrap();
        let done = queue.wait(job.id, Duration::from_secs(2)).await.unwrap();
        assert_eq!(done.status, JobStatus::Failed);
        assert!(done.last_error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn enqueue_without_worker_is_rejected() {
        let queue = JobQueue::builder(&AppConfig::development().queue).start();
        assert!(matches!(
            queue.enqueue(None, &ticket_payload()).await,
            Err(JobError::QueueClosed(QueueName::TicketProcessing))
        ));
    }

    #[tokio::test]
    async fn counts_and_list_respect_organization() {
        let queue = JobQueue::builder(&AppConfig::development().queue)
            .worker(Arc::new(Flaky { calls: AtomicU32::new(0), succeed_on: 1 }))
            .start();
        let org = Uuid::new_v4();

        let mine = queue.enqueue(Some(org), &ticket_payload()).await.unwrap();
        let theirs = queue.enqueue(Some(Uuid::new_v4()), &ticket_payload()).await.unwrap();
        queue.wait(mine.id, Duration::from_secs(2)).await;
        queue.wait(theirs.id, Duration::from_secs(2)).await;

        let listed = queue.list(Some(QueueName::TicketProcessing), Some(org)).await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, mine.id);

        let counts = queue.counts(Some(org)).await;
        let ticket_counts = counts.iter().find(|c| c.queue == "ticket-processing").unwrap();
        assert_eq!(ticket_counts.completed, 1);
        assert_eq!(counts.len(), QueueName::ALL.len());
    }

    #[tokio::test]
    async fn concurrency_limits_simultaneous_runs() {
        let mut config = AppConfig::development().queue;
        config.concurrency = 2;
        let worker = Arc::new(Gated::new());
        let queue = JobQueue::builder(&config)
            .worker(worker.clone())
            .options(QueueName::TicketProcessing, JobOptions::once())
            .start();

        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(queue.enqueue(None, &ticket_payload()).await.unwrap().id);
        }

        let counts = counts_until(&queue, |c| c.active == 2 && c.waiting == 3).await;
        assert_eq!(counts.completed, 0);
        assert_eq!(worker.peak.load(Ordering::SeqCst), 2);

        worker.release.add_permits(5);
        for id in ids {
            let done = queue.wait(id, Duration::from_secs(2)).await.unwrap();
            assert_eq!(done.status, JobStatus::Completed);
        }
        assert_eq!(worker.peak.load(Ordering::SeqCst), 2);
        assert_eq!(worker.running.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn delayed_jobs_wait_before_running() {
        let mut config = AppConfig::development().queue;
        config.concurrency = 1;
        let worker = Arc::new(Gated::new());
        let queue = JobQueue::builder(&config)
            .worker(worker.clone())
            .options(
                QueueName::TicketProcessing,
                JobOptions {
                    attempts: 1,
                    delay: Duration::from_millis(50),
                    backoff: Backoff::None,
                },
            )
            .start();

        let first = queue.enqueue(None, &ticket_payload()).await.unwrap();
        assert_eq!(first.status, JobStatus::Delayed);
        assert_eq!(ticket_counts(&queue.counts(None).await).delayed, 1);

        // Past its delay the first job holds the only slot
        counts_until(&queue, |c| c.active == 1 && c.delayed == 0).await;

        // The second leaves the delay and waits for the slot
        let second = queue.enqueue(None, &ticket_payload()).await.unwrap();
        assert_eq!(second.status, JobStatus::Delayed);
        counts_until(&queue, |c| c.active == 1 && c.waiting == 1).await;
        assert_eq!(queue.get(second.id).await.unwrap().status, JobStatus::Waiting);

        // All three states at once
        let third = queue.enqueue(None, &ticket_payload()).await.unwrap();
        let counts = ticket_counts(&queue.counts(None).await);
        assert_eq!((counts.delayed, counts.waiting, counts.active), (1, 1, 1));

        worker.release.add_permits(3);
        for id in [first.id, second.id, third.id] {
            let done = queue.wait(id, Duration::from_secs(2)).await.unwrap();
            assert_eq!(done.status, JobStatus::Completed);
        }
        assert_eq!(worker.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn finished_jobs_beyond_retention_are_dropped() {
        let mut config = AppConfig::development().queue;
        config.retain_finished = 2;
        let queue = JobQueue::builder(&config)
            .worker(Arc::new(Flaky { calls: AtomicU32::new(0), succeed_on: 1 }))
            .start();

        let mut ids = Vec::new();
        for _ in 0..5 {
            let job = queue.enqueue(None, &ticket_payload()).await.unwrap();
            queue.wait(job.id, Duration::from_secs(2)).await.unwrap();
            ids.push(job.id);
        }

        let kept: Vec<Uuid> = queue
            .list(Some(QueueName::TicketProcessing), None)
            .await
            .into_iter()
            .map(|job| job.id)
            .collect();
        assert_eq!(kept.len(), 2);
        assert!(kept.contains(&ids[3]));
        assert!(kept.contains(&ids[4]));
        assert!(queue.get(ids[0]).await.is_none());
        assert_eq!(ticket_counts(&queue.counts(None).await).completed, 2);
    }

    #[tokio::test]
    async fn chosen_ids_are_used_once() {
        let worker = Arc::new(Gated::new());
        let queue = JobQueue::builder(&AppConfig::development().queue)
            .worker(worker.clone())
            .options(QueueName::TicketProcessing, JobOptions::once())
            .start();

        let id = Uuid::new_v4();
        let job = queue.enqueue_with_id(id, None, &ticket_payload()).await.unwrap();
        assert_eq!(job.id, id);
        assert!(matches!(
            queue.enqueue_with_id(id, None, &ticket_payload()).await,
            Err(JobError::DuplicateId(dup)) if dup == id
        ));

        worker.release.add_permits(1);
        let done = queue.wait(id, Duration::from_secs(2)).await.unwrap();
        assert_eq!(done.status, JobStatus::Completed);
    }
}
