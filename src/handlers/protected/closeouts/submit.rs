// handlers/protected/closeouts/submit.rs - POST /api/closeouts/submit handler
// The request is audited under its job id before the job is queued.

use axum::{extract::State, Extension};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::{AuditAction, EntityType};
use crate::jobs::payloads::ProcessCloseout;
use crate::middleware::{parse_uuid, ApiResponse, ApiResult, AuthUser, JsonBody, RequestMeta, RoleGuard};
use crate::services::AuditEntry;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseoutRequest {
    pub ticket_id: String,
}

/// POST /api/closeouts/submit
pub async fn submit_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    meta: RequestMeta,
    JsonBody(body): JsonBody<CloseoutRequest>,
) -> ApiResult<Value> {
    auth.require(RoleGuard::AnyRole)?;
    let ticket_id = parse_uuid(&body.ticket_id, "ticket id")?;

    let ticket = state.tickets().get(auth.organization_id, ticket_id).await?;
    let job_id = Uuid::new_v4();

    state
        .audit()
        .record(
            &meta.actor(&auth),
            AuditEntry::new(AuditAction::CloseoutSubmitted, EntityType::Job, job_id)
                .ticket(ticket.id)
                .data(json!({ "jobId": job_id, "ticketNumber": ticket.ticket_number })),
        )
        .await?;
    let job = state
        .jobs
        .enqueue_with_id(
            job_id,
            Some(auth.organization_id),
            &ProcessCloseout {
                ticket_id: ticket.id,
                user_id: auth.user_id,
            },
        )
        .await?;

    Ok(ApiResponse::accepted(json!({ "jobId": job.id })))
}
