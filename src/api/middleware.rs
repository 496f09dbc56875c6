use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Duration;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::api_utils::ClientIp;
use crate::api::model::app_state::AppState;
use crate::streamhub_error::{StreamHubError, StreamHubErrorKind};
use crate::utils::{debug_if_enabled, MSG_TOO_MANY_REQUESTS};

/// Fixed window request limit per client ip.
pub async fn rate_limit(
    State(app_state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    request: Request,
    next: Next,
) -> Result<Response, StreamHubError> {
    let security = &app_state.config.security;
    if security.rate_limit_max_requests > 0 {
        let window = Duration::seconds(i64::try_from(security.rate_limit_window_secs).unwrap_or(60));
        let count = app_state.kv.increment(&format!("rl:{ip}"), window);
        if count > u64::from(security.rate_limit_max_requests) {
            debug_if_enabled!("Rate limit hit for {}", ip);
            return Err(StreamHubError::new(StreamHubErrorKind::TooManyRequests, MSG_TOO_MANY_REQUESTS.to_string()));
        }
    }
    Ok(next.run(request).await)
}

pub fn security_headers() -> Vec<SetResponseHeaderLayer<HeaderValue>> {
    [
        ("x-content-type-options", "nosniff"),
        ("x-frame-options", "DENY"),
        ("referrer-policy", "no-referrer"),
        ("permissions-policy", "camera=(), microphone=(), geolocation=()"),
    ].into_iter()
        .map(|(name, value)| SetResponseHeaderLayer::if_not_present(HeaderName::from_static(name), HeaderValue::from_static(value)))
        .collect()
}
