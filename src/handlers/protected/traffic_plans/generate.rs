// handlers/protected/traffic_plans/generate.rs - POST /api/traffic-plans/generate handler
// The request is audited under its job id before the job is queued.

use axum::{extract::State, Extension};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::{AuditAction, EntityType};
use crate::error::ApiError;
use crate::jobs::payloads::GenerateTrafficPlan;
use crate::middleware::{parse_uuid, ApiResponse, ApiResult, AuthUser, JsonBody, RequestMeta, RoleGuard};
use crate::services::AuditEntry;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficPlanRequest {
    pub ticket_id: String,
    #[serde(default)]
    pub template_id: String,
}

/// POST /api/traffic-plans/generate
pub async fn generate_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    meta: RequestMeta,
    JsonBody(body): JsonBody<TrafficPlanRequest>,
) -> ApiResult<Value> {
    auth.require(RoleGuard::AnyRole)?;
    let ticket_id = parse_uuid(&body.ticket_id, "ticket id")?;
    if body.template_id.trim().is_empty() {
        return Err(ApiError::validation_error(
            "Validation failed",
            vec!["Template id is required".to_string()],
        ));
    }

    let ticket = state.tickets().get(auth.organization_id, ticket_id).await?;
    let payload = GenerateTrafficPlan {
        ticket_id: ticket.id,
        template_id: body.template_id,
    };
    let job_id = Uuid::new_v4();

    state
        .audit()
        .record(
            &meta.actor(&auth),
            AuditEntry::new(AuditAction::TrafficPlanRequested, EntityType::Job, job_id)
                .ticket(ticket.id)
                .data(json!({ "jobId": job_id, "templateId": payload.template_id })),
        )
        .await?;
    let job = state
        .jobs
        .enqueue_with_id(job_id, Some(auth.organization_id), &payload)
        .await?;

    Ok(ApiResponse::accepted(json!({ "jobId": job.id })))
}
