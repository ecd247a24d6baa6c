// handlers/public/health.rs - GET /health and GET /

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::app::AppState;
use crate::middleware::ApiResponse;

/// Service banner
pub async fn root() -> Response {
    ApiResponse::success(json!({
        "name": "Utility Permit API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health (public)",
            "auth": "/api/auth/* (login public, rest protected)",
            "tickets": "/api/tickets (protected)",
            "permits": "/api/permits (protected)",
            "audit": "/api/audit (protected)",
            "records": "/api/traffic-plans, /api/inspections, /api/evidence, /api/closeouts (protected)",
            "admin": "/admin/queues (compliance managers)",
        }
    }))
    .into_response()
}

/// Liveness plus a store round trip; 503 when the store is unreachable
pub async fn health(State(state): State<AppState>) -> Response {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => ApiResponse::success(json!({
            "status": "ok",
            "timestamp": now,
            "database": "ok",
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "Database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database": "unreachable",
                    }
                })),
            )
                .into_response()
        }
    }
}
