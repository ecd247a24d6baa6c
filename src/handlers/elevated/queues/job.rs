// handlers/elevated/queues/job.rs - GET /admin/queues/jobs/:id handler

use axum::{
    extract::{Path, State},
    Extension,
};

use crate::app::AppState;
use crate::error::ApiError;
use crate::jobs::JobRecord;
use crate::middleware::{parse_uuid, ApiResponse, ApiResult, AuthUser, RoleGuard};

/// GET /admin/queues/jobs/:id - one job envelope; other organizations' jobs are not found
pub async fn job_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<JobRecord> {
    auth.require(RoleGuard::ComplianceManager)?;
    let id = parse_uuid(&id, "job id")?;

    state
        .jobs
        .get(id)
        .await
        .filter(|job| job.organization_id == Some(auth.organization_id))
        .map(ApiResponse::success)
        .ok_or_else(|| ApiError::not_found("Job not found"))
}
