use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, patch, post},
    Router,
};
use governor::DefaultDirectRateLimiter;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{AppConfig, SecurityConfig};
use crate::database::Store;
use crate::error::ApiError;
use crate::handlers;
use crate::jobs::JobQueue;
use crate::middleware::{build_limiter, jwt_auth_middleware, rate_limit_middleware};
use crate::services::{AuditService, DashboardService, PermitService, TicketService};

/// Shared handles for every request
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub jobs: JobQueue,
    pub config: Arc<AppConfig>,
    pub limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, jobs: JobQueue, config: AppConfig) -> Self {
        Self {
            limiter: build_limiter(&config.api),
            config: Arc::new(config),
            store,
            jobs,
        }
    }

    pub fn tickets(&self) -> TicketService {
        TicketService::new(self.store.clone())
    }

    pub fn permits(&self) -> PermitService {
        PermitService::new(self.store.clone())
    }

    pub fn audit(&self) -> AuditService {
        AuditService::new(self.store.clone())
    }

    pub fn dashboard(&self) -> DashboardService {
        DashboardService::new(self.store.clone())
    }
}

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .merge(auth_routes())
        .merge(ticket_routes())
        .merge(permit_routes())
        .merge(audit_routes())
        .merge(record_routes())
        .merge(elevated_routes())
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    Router::new()
        .merge(public_routes())
        .merge(protected)
        .fallback(not_found)
        // Global middleware, outermost first
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.security))
                .layer(DefaultBodyLimit::max(state.config.api.max_request_size_bytes))
                .layer(from_fn_with_state(state.clone(), rate_limit_middleware)),
        )
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    use handlers::public::{auth, health};

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/api/auth/login", post(auth::login_post))
}

fn auth_routes() -> Router<AppState> {
    use handlers::protected::auth;

    Router::new()
        .route("/api/auth/register", post(auth::register_post))
        .route("/api/auth/me", get(auth::me_get))
        .route("/api/auth/password", patch(auth::password_patch))
}

fn ticket_routes() -> Router<AppState> {
    use handlers::protected::tickets;

    Router::new()
        .route("/api/tickets", get(tickets::list_get))
        .route("/api/tickets/import", post(tickets::import_post))
        .route("/api/tickets/dashboard/summary", get(tickets::dashboard_get))
        .route("/api/tickets/:id", get(tickets::show_get))
        .route("/api/tickets/:id/status", patch(tickets::status_patch))
        .route("/api/tickets/:id/prefill-permit", post(tickets::prefill_permit_post))
}

fn permit_routes() -> Router<AppState> {
    use handlers::protected::permits;

    Router::new()
        .route("/api/permits", get(permits::list_get))
        .route("/api/permits/prefill", post(permits::prefill_post))
        .route("/api/permits/:id", get(permits::show_get).patch(permits::update_patch))
        .route("/api/permits/:id/submit", post(permits::submit_post))
}

fn audit_routes() -> Router<AppState> {
    use handlers::protected::audit;

    Router::new()
        .route("/api/audit/organization/summary", get(audit::summary_get))
        .route("/api/audit/:ticket_id", get(audit::trail_get))
        .route("/api/audit/:ticket_id/export", get(audit::export_get))
}

fn record_routes() -> Router<AppState> {
    use handlers::protected::{closeouts, evidence, inspections, traffic_plans};

    Router::new()
        .route("/api/traffic-plans", get(traffic_plans::list_get))
        .route("/api/traffic-plans/generate", post(traffic_plans::generate_post))
        .route("/api/inspections", get(inspections::list_get))
        .route("/api/inspections/schedule", post(inspections::schedule_post))
        .route("/api/evidence", get(evidence::list_get))
        .route("/api/closeouts", get(closeouts::list_get))
        .route("/api/closeouts/submit", post(closeouts::submit_post))
}

fn elevated_routes() -> Router<AppState> {
    use handlers::elevated::queues;

    Router::new()
        .route("/admin/queues", get(queues::counts_get))
        .route("/admin/queues/jobs/:id", get(queues::job_get))
}

async fn not_found() -> impl IntoResponse {
    ApiError::not_found("Route not found")
}

/// CORS from configured origins; `*` allows any origin
fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    if security.cors_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}
