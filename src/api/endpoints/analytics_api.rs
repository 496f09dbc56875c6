use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;

use crate::api::api_utils::ClientIp;
use crate::api::model::app_state::AppState;
use crate::auth::authenticator::MaybeAuthUser;
use crate::service::analytics_service::{self, TrackEventRequest};
use crate::service::risk_service::{self, SecurityCheckRequest};
use crate::streamhub_error::StreamHubError;

async fn track_event(
    State(app_state): State<Arc<AppState>>,
    MaybeAuthUser(user): MaybeAuthUser,
    Json(req): Json<TrackEventRequest>,
) -> Result<impl IntoResponse, StreamHubError> {
    analytics_service::track(&app_state.config, &app_state.repos, user.as_ref().map(|u| u.id.as_str()), &req, Utc::now()).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn security_check(
    State(app_state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
    Json(req): Json<SecurityCheckRequest>,
) -> impl IntoResponse {
    Json(risk_service::check(&app_state.config, &app_state.http_client, &headers, &ip, &req).await)
}

pub fn analytics_api_register() -> axum::Router<Arc<AppState>> {
    axum::Router::new()
        .route("/analytics/event", axum::routing::post(track_event))
        .route("/security/check", axum::routing::post(security_check))
}
