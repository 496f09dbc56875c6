use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;

use crate::api::model::app_state::AppState;
use crate::auth::authenticator::AuthUser;
use crate::service::moderation_service::{self, ReportRequest};
use crate::streamhub_error::StreamHubError;

async fn report(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(req): Json<ReportRequest>,
) -> Result<impl IntoResponse, StreamHubError> {
    let flag = moderation_service::report(&app_state.config, &app_state.repos, &user.id, &req, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(flag)))
}

pub fn moderation_api_register() -> axum::Router<Arc<AppState>> {
    axum::Router::new()
        .route("/moderation/report", axum::routing::post(report))
}
