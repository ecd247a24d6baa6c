// handlers/protected/tickets/list.rs - GET /api/tickets handler

use axum::{
    extract::{Query, State},
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::utils::Paging;
use crate::app::AppState;
use crate::database::models::TicketStatus;
use crate::database::TicketQuery;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, RoleGuard};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// GET /api/tickets?status&page&limit - newest first with pagination
pub async fn list_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Value> {
    auth.require(RoleGuard::AnyRole)?;

    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::parse::<TicketStatus>)
        .transpose()?;
    let paging = Paging::parse(
        query.page.as_deref(),
        query.limit.as_deref(),
        state.config.api.default_page_size as u64,
        state.config.api.max_page_size as u64,
    )?;

    let (tickets, total) = state
        .tickets()
        .list(
            auth.organization_id,
            &TicketQuery {
                status,
                offset: paging.offset(),
                limit: paging.limit,
            },
        )
        .await?;

    Ok(ApiResponse::success(json!({
        "tickets": tickets,
        "pagination": {
            "page": paging.page,
            "limit": paging.limit,
            "total": total,
            "totalPages": paging.total_pages(total),
        },
    })))
}
