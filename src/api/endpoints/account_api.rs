use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::api::api_utils::ClientIp;
use crate::api::model::app_state::AppState;
use crate::auth::authenticator::AuthUser;
use crate::model::UserDto;
use crate::service::access_code_service::redeem_code;
use crate::service::parental_service::{self, UpdateParentalRequest, VerifyPinRequest};
use crate::service::referral_service::{apply_referral, list_badges, referral_info};
use crate::service::terms_service::{self, AcceptTermsRequest};
use crate::streamhub_error::StreamHubError;
use crate::utils::MSG_INVALID_PIN;

#[derive(Debug, serde::Deserialize)]
struct CodeRequest {
    code: String,
}

async fn redeem(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(req): Json<CodeRequest>,
) -> Result<impl IntoResponse, StreamHubError> {
    let now = Utc::now();
    let (code, user) = redeem_code(&app_state.repos, &user.id, &req.code, now).await?;
    Ok(Json(json!({"durationDays": code.duration_days, "user": UserDto::from_user(&user, now)})))
}

async fn referral(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> impl IntoResponse {
    Json(referral_info(&app_state.repos, &user).await)
}

async fn referral_apply(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(req): Json<CodeRequest>,
) -> Result<impl IntoResponse, StreamHubError> {
    Ok(Json(apply_referral(&app_state.config, &app_state.repos, &user.id, &req.code, Utc::now()).await?))
}

async fn badges(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> impl IntoResponse {
    Json(list_badges(&app_state.repos, &user.id).await)
}

async fn parental_get(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> impl IntoResponse {
    Json(parental_service::get_settings(&app_state.repos, &user.id).await)
}

async fn parental_update(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(req): Json<UpdateParentalRequest>,
) -> Result<impl IntoResponse, StreamHubError> {
    Ok(Json(parental_service::update_settings(&app_state.repos, &user.id, &req, Utc::now()).await?))
}

async fn parental_verify(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(req): Json<VerifyPinRequest>,
) -> Result<impl IntoResponse, StreamHubError> {
    if parental_service::verify_pin(&app_state.repos, &user.id, &req.pin).await {
        Ok(Json(json!({"valid": true})))
    } else {
        Err(StreamHubError::forbidden(MSG_INVALID_PIN))
    }
}

async fn terms_status(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> impl IntoResponse {
    Json(terms_service::status(&app_state.config, &app_state.repos, &user.id).await)
}

async fn terms_accept(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ClientIp(ip): ClientIp,
    Json(req): Json<AcceptTermsRequest>,
) -> Result<impl IntoResponse, StreamHubError> {
    Ok(Json(terms_service::accept(&app_state.config, &app_state.repos, &user.id, &req.version, &ip, Utc::now()).await?))
}

pub fn account_api_register() -> axum::Router<Arc<AppState>> {
    axum::Router::new()
        .route("/access-codes/redeem", axum::routing::post(redeem))
        .route("/referral", axum::routing::get(referral))
        .route("/referral/apply", axum::routing::post(referral_apply))
        .route("/badges", axum::routing::get(badges))
        .route("/parental", axum::routing::get(parental_get).put(parental_update))
        .route("/parental/verify", axum::routing::post(parental_verify))
        .route("/terms", axum::routing::get(terms_status))
        .route("/terms/accept", axum::routing::post(terms_accept))
}
