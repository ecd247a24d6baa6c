// handlers/protected/tickets/import.rs - POST /api/tickets/import handler

use axum::{extract::State, Extension};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::jobs::payloads::ProcessTicket;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, JsonBody, RequestMeta, RoleGuard};

fn default_source() -> String {
    "811".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    #[serde(default = "default_source")]
    pub source: String,
    pub payload: Value,
}

/// POST /api/tickets/import - validate a raw 811 notice, store it and queue processing
///
/// Expected Input:
/// ```json
/// { "source": "811", "payload": { "excavatorCompany": "...", "workLocation": { ... }, ... } }
/// ```
///
/// Responds `201 {ticketId, ticketNumber, jobId}`.
pub async fn import_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    meta: RequestMeta,
    JsonBody(body): JsonBody<ImportRequest>,
) -> ApiResult<Value> {
    auth.require(RoleGuard::PermitCoordinator)?;

    let ticket = state
        .tickets()
        .import(&meta.actor(&auth), &body.source, body.payload)
        .await?;

    let job = state
        .jobs
        .enqueue(
            Some(ticket.organization_id),
            &ProcessTicket {
                ticket_id: ticket.id,
                organization_id: ticket.organization_id,
                raw_data: ticket.raw_data.clone(),
            },
        )
        .await?;

    Ok(ApiResponse::created(json!({
        "ticketId": ticket.id,
        "ticketNumber": ticket.ticket_number,
        "jobId": job.id,
    })))
}
