// handlers/protected/permits/prefill.rs - POST /api/permits/prefill handler

use axum::{extract::State, Extension};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::middleware::{parse_uuid, ApiResponse, ApiResult, AuthUser, JsonBody, RequestMeta, RoleGuard};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefillRequest {
    pub ticket_id: String,
    #[serde(default)]
    pub municipality: String,
    #[serde(default)]
    pub permit_type: String,
}

/// POST /api/permits/prefill - draft a permit with application data derived from the ticket
///
/// Responds `{permitId, prefilledData}`.
pub async fn prefill_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    meta: RequestMeta,
    JsonBody(body): JsonBody<PrefillRequest>,
) -> ApiResult<Value> {
    auth.require(RoleGuard::PermitCoordinator)?;
    let ticket_id = parse_uuid(&body.ticket_id, "ticket id")?;

    let permit = state
        .permits()
        .create_prefilled_permit(&meta.actor(&auth), ticket_id, &body.municipality, &body.permit_type)
        .await?;

    Ok(ApiResponse::success(json!({
        "permitId": permit.id,
        "prefilledData": permit.prefilled_data,
    })))
}
