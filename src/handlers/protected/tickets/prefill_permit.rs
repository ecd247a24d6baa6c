// handlers/protected/tickets/prefill_permit.rs - POST /api/tickets/:id/prefill-permit handler
// The request is audited under its job id before the job is queued.

use axum::{
    extract::{Path, State},
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::{AuditAction, EntityType};
use crate::error::ApiError;
use crate::jobs::payloads::PrefillPermit;
use crate::middleware::{parse_uuid, ApiResponse, ApiResult, AuthUser, JsonBody, RequestMeta, RoleGuard};
use crate::services::AuditEntry;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefillRequest {
    #[serde(default)]
    pub municipality: String,
    #[serde(default)]
    pub permit_type: String,
}

/// POST /api/tickets/:id/prefill-permit - queue permit prefill for later
pub async fn prefill_permit_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    meta: RequestMeta,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<PrefillRequest>,
) -> ApiResult<Value> {
    auth.require(RoleGuard::PermitCoordinator)?;
    let id = parse_uuid(&id, "ticket id")?;

    let mut errors = Vec::new();
    if body.municipality.trim().is_empty() {
        errors.push("Municipality is required".to_string());
    }
    if body.permit_type.trim().is_empty() {
        errors.push("Permit type is required".to_string());
    }
    if !errors.is_empty() {
        return Err(ApiError::validation_error("Validation failed", errors));
    }

    let ticket = state.tickets().get(auth.organization_id, id).await?;
    let payload = PrefillPermit {
        ticket_id: ticket.id,
        municipality: body.municipality,
        permit_type: body.permit_type,
    };
    let job_id = Uuid::new_v4();

    state
        .audit()
        .record(
            &meta.actor(&auth),
            AuditEntry::new(AuditAction::PermitPrefillQueued, EntityType::Job, job_id)
                .ticket(ticket.id)
                .data(json!({
                    "jobId": job_id,
                    "municipality": payload.municipality,
                    "permitType": payload.permit_type,
                })),
        )
        .await?;
    let job = state
        .jobs
        .enqueue_with_id(job_id, Some(auth.organization_id), &payload)
        .await?;

    Ok(ApiResponse::accepted(json!({
        "message": "Permit prefill queued",
        "jobId": job.id,
    })))
}
