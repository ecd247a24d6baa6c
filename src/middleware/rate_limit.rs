use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

use crate::app::AppState;
use crate::config::ApiConfig;
use crate::error::ApiError;

/// Global limiter allowing `rate_limit_requests` per `rate_limit_window_secs`,
/// or `None` when rate limiting is switched off
pub fn build_limiter(api: &ApiConfig) -> Option<Arc<DefaultDirectRateLimiter>> {
    if !api.enable_rate_limiting {
        return None;
    }

    let burst = NonZeroU32::new(api.rate_limit_requests)?;
    let window = Duration::from_secs(api.rate_limit_window_secs.max(1));
    let quota = Quota::with_period(window / burst.get())?.allow_burst(burst);

    tracing::info!(
        "Rate limiting enabled: {} requests per {}s",
        burst,
        window.as_secs()
    );
    Some(Arc::new(RateLimiter::direct(quota)))
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(limiter) = &state.limiter {
        if limiter.check().is_err() {
            tracing::warn!("Rate limit exceeded for {}", request.uri().path());
            return Err(ApiError::too_many_requests("Too many requests, please try again later"));
        }
    }
    Ok(next.run(request).await)
}
