// handlers/protected/inspections/schedule.rs - POST /api/inspections/schedule handler
// The request is audited under its job id before the job is queued.

use axum::{extract::State, Extension};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::{AuditAction, EntityType};
use crate::error::ApiError;
use crate::jobs::payloads::ScheduleInspection;
use crate::middleware::{parse_uuid, ApiResponse, ApiResult, AuthUser, JsonBody, RequestMeta, RoleGuard};
use crate::services::ticket_service::parse_date;
use crate::services::AuditEntry;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionRequest {
    pub ticket_id: String,
    pub permit_id: Option<String>,
    #[serde(default)]
    pub inspection_type: String,
    #[serde(default)]
    pub preferred_date: String,
}

/// POST /api/inspections/schedule
pub async fn schedule_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    meta: RequestMeta,
    JsonBody(body): JsonBody<InspectionRequest>,
) -> ApiResult<Value> {
    auth.require(RoleGuard::AnyRole)?;
    let ticket_id = parse_uuid(&body.ticket_id, "ticket id")?;
    let permit_id = body
        .permit_id
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| parse_uuid(s, "permit id"))
        .transpose()?;

    let mut errors = Vec::new();
    if body.inspection_type.trim().is_empty() {
        errors.push("Inspection type is required".to_string());
    }
    if parse_date(&body.preferred_date).is_none() {
        errors.push("Preferred date must be YYYY-MM-DD or RFC 3339".to_string());
    }
    if !errors.is_empty() {
        return Err(ApiError::validation_error("Validation failed", errors));
    }

    let ticket = state.tickets().get(auth.organization_id, ticket_id).await?;
    if let Some(permit_id) = permit_id {
        let permit = state.permits().get(auth.organization_id, permit_id).await?;
        if permit.ticket_id != ticket.id {
            return Err(ApiError::bad_request("Permit does not belong to this ticket"));
        }
    }

    let payload = ScheduleInspection {
        ticket_id: ticket.id,
        permit_id,
        inspection_type: body.inspection_type,
        preferred_date: body.preferred_date,
    };
    let job_id = Uuid::new_v4();

    state
        .audit()
        .record(
            &meta.actor(&auth),
            AuditEntry::new(AuditAction::InspectionRequested, EntityType::Job, job_id)
                .ticket(ticket.id)
                .data(json!({
                    "jobId": job_id,
                    "permitId": payload.permit_id,
                    "inspectionType": payload.inspection_type,
                    "preferredDate": payload.preferred_date,
                })),
        )
        .await?;
    let job = state
        .jobs
        .enqueue_with_id(job_id, Some(auth.organization_id), &payload)
        .await?;

    Ok(ApiResponse::accepted(json!({ "jobId": job.id })))
}
