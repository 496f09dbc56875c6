use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::api::api_utils::ClientIp;
use crate::api::model::app_state::AppState;
use crate::auth::authenticator::MaybeAuthUser;
use crate::model::User;
use crate::service::ad_service::{self, AdRequest, ImpressionRequest};
use crate::service::adblock_service::{generate_ad_token, report_detection, verify_ad_loaded, AdBlockReport, VerifyAdRequest};
use crate::streamhub_error::{StreamHubError, StreamHubErrorKind};

/// Anonymous viewers are capped per ip.
fn ad_subject(user: Option<&User>, ip: &str) -> (String, bool) {
    let now = Utc::now();
    user.map_or_else(|| (format!("ip:{ip}"), false), |u| (u.id.clone(), u.is_premium(now)))
}

async fn request_ad(
    State(app_state): State<Arc<AppState>>,
    MaybeAuthUser(user): MaybeAuthUser,
    ClientIp(ip): ClientIp,
    Json(req): Json<AdRequest>,
) -> impl IntoResponse {
    let (subject, premium) = ad_subject(user.as_ref(), &ip);
    Json(ad_service::request_ad(&app_state.config.ads, &app_state.repos, premium, &subject, req.session_id.as_deref(), Utc::now()).await)
}

async fn impression(
    State(app_state): State<Arc<AppState>>,
    MaybeAuthUser(user): MaybeAuthUser,
    ClientIp(ip): ClientIp,
    Json(req): Json<ImpressionRequest>,
) -> impl IntoResponse {
    let (subject, premium) = ad_subject(user.as_ref(), &ip);
    match ad_service::record_impression(&app_state.config.ads, &app_state.repos, premium, &subject, &req, Utc::now()).await {
        Ok(decision) => Json(decision).into_response(),
        Err(err) if err.kind == StreamHubErrorKind::TooManyRequests => {
            (StatusCode::TOO_MANY_REQUESTS, Json(json!({"allowed": false, "reason": err.message, "error": err.message}))).into_response()
        }
        Err(err) => err.into_response(),
    }
}

async fn adblock_token(
    State(app_state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
) -> impl IntoResponse {
    Json(generate_ad_token(app_state.kv.as_ref(), &app_state.config.ads, &ip, Utc::now()))
}

async fn adblock_verify(
    State(app_state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    Json(req): Json<VerifyAdRequest>,
) -> Result<impl IntoResponse, StreamHubError> {
    verify_ad_loaded(app_state.kv.as_ref(), &req, &ip, Utc::now())?;
    Ok(StatusCode::NO_CONTENT)
}

async fn adblock_report(
    State(app_state): State<Arc<AppState>>,
    MaybeAuthUser(user): MaybeAuthUser,
    ClientIp(ip): ClientIp,
    Json(report): Json<AdBlockReport>,
) -> Result<impl IntoResponse, StreamHubError> {
    let detection = report_detection(&app_state.config.ads, &app_state.repos, app_state.kv.as_ref(),
                                     user.as_ref().map(|u| u.id.as_str()), &ip, &report, Utc::now()).await?;
    Ok(Json(detection))
}

pub fn ads_api_register() -> axum::Router<Arc<AppState>> {
    axum::Router::new()
        .route("/ads/request", axum::routing::post(request_ad))
        .route("/ads/impression", axum::routing::post(impression))
        .route("/adblock/token", axum::routing::post(adblock_token))
        .route("/adblock/verify", axum::routing::post(adblock_verify))
        .route("/adblock/report", axum::routing::post(adblock_report))
}
