#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt; // for `oneshot`

use utility_permit_api::config::AppConfig;
use utility_permit_api::database::{MemoryStore, Store};
use utility_permit_api::jobs::{workers::default_workers, JobOptions, JobQueue, JobRecord, QueueName};
use utility_permit_api::seed::{self, DemoData};
use utility_permit_api::{build_router, AppState};

pub use utility_permit_api::seed::{COORDINATOR_EMAIL, DEMO_PASSWORD, MANAGER_EMAIL, SUPERVISOR_EMAIL};

/// Router over a freshly seeded in-memory store, with the real job queue behind it
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub jobs: JobQueue,
    pub demo: DemoData,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestResponse {
    /// `data` of a success envelope
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }
}

impl TestApp {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(Self::config()).await
    }

    /// Development settings with the cheapest bcrypt cost
    pub fn config() -> AppConfig {
        let mut config = AppConfig::development();
        config.security.password_hash_cost = 4;
        config
    }

    pub async fn spawn_with(config: AppConfig) -> Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let store = Arc::new(MemoryStore::new());
        let demo = seed::seed_demo_data(store.as_ref(), config.security.password_hash_cost)
            .await
            .context("seeding demo data")?;

        // No initial delay so prefill jobs finish inside a test
        let jobs = JobQueue::builder(&config.queue)
            .workers(default_workers())
            .options(QueueName::PermitPrefill, JobOptions::once())
            .start();

        let state = AppState::new(store.clone() as Arc<dyn Store>, jobs.clone(), config);
        Ok(Self {
            router: build_router(state),
            store,
            jobs,
            demo,
        })
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<TestResponse> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::USER_AGENT, "integration-tests")
            .header("x-forwarded-for", "198.51.100.20");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json)?))?,
            None => builder.body(Body::empty())?,
        };

        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).context("response body is not JSON")?
        };
        Ok(TestResponse { status, body })
    }

    pub async fn get(&self, uri: &str, token: &str) -> Result<TestResponse> {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> Result<TestResponse> {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> Result<TestResponse> {
        self.request(Method::PATCH, uri, Some(token), Some(body)).await
    }

    /// Log in as a demo user and return the JWT
    pub async fn login(&self, email: &str) -> Result<String> {
        let res = self
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(serde_json::json!({ "email": email, "password": DEMO_PASSWORD })),
            )
            .await?;
        anyhow::ensure!(res.status == StatusCode::OK, "login failed: {}", res.body);
        res.data()["token"]
            .as_str()
            .map(str::to_string)
            .context("token missing from login response")
    }

    pub async fn coordinator(&self) -> Result<String> {
        self.login(COORDINATOR_EMAIL).await
    }

    pub async fn supervisor(&self) -> Result<String> {
        self.login(SUPERVISOR_EMAIL).await
    }

    pub async fn manager(&self) -> Result<String> {
        self.login(MANAGER_EMAIL).await
    }

    /// Wait for a queued job to finish
    pub async fn finished_job(&self, id: &str) -> Result<JobRecord> {
        let id = id.parse().context("job id is not a UUID")?;
        let job = self
            .jobs
            .wait(id, Duration::from_secs(5))
            .await
            .context("job not found")?;
        anyhow::ensure!(job.status.is_finished(), "job {} still {:?}", id, job.status);
        Ok(job)
    }
}

/// A valid raw 811 notice
pub fn notice() -> Value {
    serde_json::json!({
        "ticketNumber": "TX-811-2025-20001",
        "requestDate": "2025-04-01",
        "workStartDate": "2025-04-10",
        "workEndDate": "2025-04-14",
        "excavatorCompany": "Capital Fiber Builders",
        "excavatorContact": { "name": "Ana Ruiz", "phone": "(512) 555-0700", "email": "ana@capfiber.com" },
        "workLocation": { "address": "900 Red River St", "city": "Austin", "state": "TX", "zip": "78701" },
        "workDescription": "Bore and place conduit for fiber backbone",
        "utilityTypes": ["fiber optic", "Electric"],
        "emergencyContact": "(512) 555-0701"
    })
}
