use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;

use crate::api::model::app_state::AppState;
use crate::auth::authenticator::{validator_admin, AuthUser};
use crate::model::{Channel, FlagStatus, Movie, Series};
use crate::service::access_code_service::{generate_codes, list_codes, GenerateCodesRequest};
use crate::service::analytics_service::{analytics_summary, stats};
use crate::service::catalog_service;
use crate::service::moderation_service::{self, ResolveRequest};
use crate::streamhub_error::StreamHubError;

#[derive(Debug, serde::Deserialize)]
struct FlagQuery {
    #[serde(default)]
    status: Option<FlagStatus>,
}

macro_rules! catalog_admin_handlers {
    ($create_fn:ident, $replace_fn:ident, $delete_fn:ident, $store:ident, $type:ty) => {
        async fn $create_fn(
            State(app_state): State<Arc<AppState>>,
            Json(item): Json<$type>,
        ) -> Result<impl IntoResponse, StreamHubError> {
            let created = catalog_service::create(&app_state.repos.$store, item, Utc::now()).await?;
            Ok((StatusCode::CREATED, Json(created)))
        }

        async fn $replace_fn(
            State(app_state): State<Arc<AppState>>,
            Path(id): Path<String>,
            Json(item): Json<$type>,
        ) -> Result<impl IntoResponse, StreamHubError> {
            Ok(Json(catalog_service::replace(&app_state.repos.$store, &id, item).await?))
        }

        async fn $delete_fn(
            State(app_state): State<Arc<AppState>>,
            Path(id): Path<String>,
        ) -> Result<impl IntoResponse, StreamHubError> {
            catalog_service::delete(&app_state.repos.$store, &id).await?;
            Ok(StatusCode::NO_CONTENT)
        }
    };
}

catalog_admin_handlers!(create_movie, replace_movie, delete_movie, movies, Movie);
catalog_admin_handlers!(create_series, replace_series, delete_series, series, Series);
catalog_admin_handlers!(create_channel, replace_channel, delete_channel, channels, Channel);

async fn create_codes(
    State(app_state): State<Arc<AppState>>,
    AuthUser(admin): AuthUser,
    Json(req): Json<GenerateCodesRequest>,
) -> Result<impl IntoResponse, StreamHubError> {
    let codes = generate_codes(&app_state.repos, &admin.id, &req, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(codes)))
}

async fn codes(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(list_codes(&app_state.repos).await)
}

async fn flags(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<FlagQuery>,
) -> impl IntoResponse {
    Json(moderation_service::list_flags(&app_state.repos, query.status).await)
}

async fn resolve_flag(
    State(app_state): State<Arc<AppState>>,
    AuthUser(admin): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<ResolveRequest>,
) -> Result<impl IntoResponse, StreamHubError> {
    Ok(Json(moderation_service::resolve(&app_state.repos, &admin.id, &id, req.action, Utc::now()).await?))
}

async fn analytics(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(analytics_summary(&app_state.repos, Utc::now()).await)
}

async fn platform_stats(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(stats(&app_state.repos, Utc::now()).await)
}

pub fn admin_api_register(app_state: Arc<AppState>) -> axum::Router<Arc<AppState>> {
    axum::Router::new()
        .route("/movies", axum::routing::post(create_movie))
        .route("/movies/{id}", axum::routing::put(replace_movie).delete(delete_movie))
        .route("/series", axum::routing::post(create_series))
        .route("/series/{id}", axum::routing::put(replace_series).delete(delete_series))
        .route("/channels", axum::routing::post(create_channel))
        .route("/channels/{id}", axum::routing::put(replace_channel).delete(delete_channel))
        .route("/access-codes", axum::routing::get(codes).post(create_codes))
        .route("/moderation", axum::routing::get(flags))
        .route("/moderation/{id}/resolve", axum::routing::post(resolve_flag))
        .route("/analytics", axum::routing::get(analytics))
        .route("/stats", axum::routing::get(platform_stats))
        .route_layer(axum::middleware::from_fn_with_state(app_state, validator_admin))
}
