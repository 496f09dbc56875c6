use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;

use crate::api::model::app_state::AppState;
use crate::auth::authenticator::AuthUser;
use crate::service::recording_service::{self, ScheduleRecordingRequest};
use crate::streamhub_error::StreamHubError;

async fn list(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> impl IntoResponse {
    Json(recording_service::list(&app_state.repos, &user.id).await)
}

async fn schedule(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(req): Json<ScheduleRecordingRequest>,
) -> Result<impl IntoResponse, StreamHubError> {
    let recording = recording_service::schedule(&app_state.config, &app_state.repos, &user, &req, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(recording)))
}

async fn cancel(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, StreamHubError> {
    Ok(Json(recording_service::cancel(&app_state.repos, &user.id, &id).await?))
}

pub fn recording_api_register() -> axum::Router<Arc<AppState>> {
    axum::Router::new()
        .route("/recordings", axum::routing::get(list).post(schedule))
        .route("/recordings/{id}", axum::routing::delete(cancel))
}
