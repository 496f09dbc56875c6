use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use log::info;
use serde_json::json;

use crate::api::api_utils::ClientIp;
use crate::api::model::app_state::AppState;
use crate::auth::authenticator::{create_jwt, AuthUser};
use crate::model::UserDto;
use crate::messaging::{send_message, MsgKind};
use crate::service::risk_service::{collect_indicators, fingerprint_from_headers, geolocate, vpn_score, ANOMALY_WARN_THRESHOLD, VPN_THRESHOLD};
use crate::service::user_service::{self, ChangePasswordRequest, LoginContext, LoginRequest, RegisterRequest};
use crate::streamhub_error::StreamHubError;

async fn login_context(app_state: &AppState, headers: &HeaderMap, ip: String) -> LoginContext {
    let geo = geolocate(&app_state.config, &app_state.http_client, &ip).await;
    let indicators = collect_indicators(headers, &ip, geo.as_ref(), None, None);
    LoginContext {
        fingerprint: Some(fingerprint_from_headers(headers, &[])),
        country: geo.and_then(|g| g.country_code),
        vpn: vpn_score(&indicators) >= VPN_THRESHOLD,
        ip,
    }
}

fn token_response(app_state: &AppState, user: &crate::model::User) -> Result<axum::response::Response, StreamHubError> {
    let now = Utc::now();
    let token = create_jwt(&app_state.config.web_auth, user, now)?;
    Ok(Json(json!({"token": token, "user": UserDto::from_user(user, now)})).into_response())
}

async fn register(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, StreamHubError> {
    let user = user_service::register(&app_state.config, &app_state.repos, &req, Utc::now()).await?;
    let response = token_response(&app_state, &user)?;
    Ok((StatusCode::CREATED, response))
}

async fn login(
    State(app_state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, StreamHubError> {
    let ctx = login_context(&app_state, &headers, ip).await;
    let ip = ctx.ip.clone();
    let (user, score) = user_service::login(&app_state.config, &app_state.repos, app_state.kv.as_ref(), &req, &ctx, Utc::now()).await?;
    info!("User {} logged in", user.username);
    if score >= ANOMALY_WARN_THRESHOLD {
        send_message(MsgKind::Security, app_state.config.messaging.as_ref(),
                     &format!("Suspicious login for {} from {ip} (score {score:.2})", user.username));
    }
    token_response(&app_state, &user)
}

async fn refresh(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, StreamHubError> {
    token_response(&app_state, &user)
}

async fn me(AuthUser(user): AuthUser) -> impl IntoResponse {
    Json(UserDto::from_user(&user, Utc::now()))
}

async fn change_password(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, StreamHubError> {
    user_service::change_password(&app_state.repos, &user.id, &req).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn auth_api_register() -> axum::Router<Arc<AppState>> {
    axum::Router::new()
        .route("/auth/register", axum::routing::post(register))
        .route("/auth/login", axum::routing::post(login))
        .route("/auth/refresh", axum::routing::post(refresh))
        .route("/auth/me", axum::routing::get(me))
        .route("/auth/password", axum::routing::post(change_password))
}
