use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Redirect};
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::api::api_utils::viewer_for;
use crate::api::model::app_state::AppState;
use crate::auth::access_token::{create_access_token, verify_access_token};
use crate::auth::authenticator::MaybeAuthUser;
use crate::model::{ContentKind, User};
use crate::service::catalog_service::{self, render_playlist, stream_resource, CatalogQuery, Viewer, PLAYLIST_RESOURCE};
use crate::streamhub_error::StreamHubError;
use crate::utils::{MSG_INVALID_INPUT, MSG_INVALID_TOKEN, MSG_PREMIUM_REQUIRED};

const GUEST_SUBJECT: &str = "guest";

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamTokenRequest {
    kind: ContentKind,
    /// a channel request without id grants the playlist
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    episode_id: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct PlayQuery {
    kind: ContentKind,
    id: String,
    #[serde(default)]
    episode: Option<String>,
    token: String,
}

#[derive(Debug, serde::Deserialize)]
struct PlaylistQuery {
    token: String,
}

macro_rules! catalog_handlers {
    ($list_fn:ident, $get_fn:ident, $store:ident) => {
        async fn $list_fn(
            State(app_state): State<Arc<AppState>>,
            MaybeAuthUser(user): MaybeAuthUser,
            headers: HeaderMap,
            Query(query): Query<CatalogQuery>,
        ) -> impl IntoResponse {
            let viewer = viewer_for(&app_state, user.as_ref(), &headers).await;
            Json(catalog_service::list(&app_state.repos.$store, &query, &viewer).await)
        }

        async fn $get_fn(
            State(app_state): State<Arc<AppState>>,
            MaybeAuthUser(user): MaybeAuthUser,
            headers: HeaderMap,
            Path(id): Path<String>,
        ) -> Result<impl IntoResponse, StreamHubError> {
            let viewer = viewer_for(&app_state, user.as_ref(), &headers).await;
            Ok(Json(catalog_service::get(&app_state.repos.$store, &id, &viewer).await?))
        }
    };
}

catalog_handlers!(list_movies, get_movie, movies);
catalog_handlers!(list_series, get_series, series);
catalog_handlers!(list_channels, get_channel, channels);

fn check_premium(premium_only: bool, viewer: &Viewer) -> Result<(), StreamHubError> {
    if premium_only && !(viewer.premium || viewer.admin) {
        return Err(StreamHubError::forbidden(MSG_PREMIUM_REQUIRED));
    }
    Ok(())
}

fn play_url(kind: ContentKind, id: &str, episode_id: Option<&str>, token: &str) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("kind", &kind.to_string()).append_pair("id", id);
    if let Some(episode_id) = episode_id {
        query.append_pair("episode", episode_id);
    }
    query.append_pair("token", token);
    format!("/api/stream/play?{}", query.finish())
}

fn playlist_url(token: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new()).append_pair("token", token).finish();
    format!("/api/channels/playlist.m3u?{query}")
}

async fn stream_token(
    State(app_state): State<Arc<AppState>>,
    MaybeAuthUser(user): MaybeAuthUser,
    headers: HeaderMap,
    Json(req): Json<StreamTokenRequest>,
) -> Result<impl IntoResponse, StreamHubError> {
    let now = Utc::now();
    let ttl = app_state.config.access_token_ttl_secs;
    let secret = &app_state.config.t_access_token_secret;
    let subject = user.as_ref().map_or(GUEST_SUBJECT, |u| u.id.as_str());
    let (token, url) = match (req.kind, req.id.as_deref()) {
        (ContentKind::Channel, None) => {
            let token = create_access_token(secret, ttl, subject, PLAYLIST_RESOURCE, now);
            let url = playlist_url(&token);
            (token, url)
        }
        (_, None) => return Err(StreamHubError::validation(MSG_INVALID_INPUT)),
        (kind, Some(id)) => {
            let viewer = viewer_for(&app_state, user.as_ref(), &headers).await;
            let episode_id = req.episode_id.as_deref();
            let (_, premium_only) = catalog_service::find_stream(&app_state.repos, kind, id, episode_id, &viewer).await?;
            check_premium(premium_only, &viewer)?;
            let token = create_access_token(secret, ttl, subject, &stream_resource(kind, id, episode_id), now);
            let url = play_url(kind, id, episode_id, &token);
            (token, url)
        }
    };
    Ok(Json(json!({"url": url, "token": token, "expiresIn": ttl})))
}

/// Redirects a valid play token to the stream and counts the view.
async fn play_stream(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<PlayQuery>,
) -> Result<impl IntoResponse, StreamHubError> {
    let now = Utc::now();
    let episode_id = query.episode.as_deref();
    let resource = stream_resource(query.kind, &query.id, episode_id);
    let subject = verify_access_token(&query.token, &app_state.config.t_access_token_secret, &resource, now)
        .ok_or_else(|| StreamHubError::unauthorized(MSG_INVALID_TOKEN))?;
    let user = app_state.repos.users.find(|u| u.id == subject).await;
    // parental controls were applied when the token was issued
    let viewer = Viewer {
        premium: user.as_ref().is_some_and(|u| u.is_premium(now)),
        admin: user.as_ref().is_some_and(User::is_admin),
        parental: None,
    };
    let (url, premium_only) = catalog_service::find_stream(&app_state.repos, query.kind, &query.id, episode_id, &viewer).await?;
    check_premium(premium_only, &viewer)?;
    catalog_service::count_view(&app_state.repos, query.kind, &query.id).await?;
    Ok(Redirect::temporary(&url))
}

async fn channel_playlist(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<PlaylistQuery>,
) -> Result<impl IntoResponse, StreamHubError> {
    let subject = verify_access_token(&query.token, &app_state.config.t_access_token_secret, PLAYLIST_RESOURCE, Utc::now())
        .ok_or_else(|| StreamHubError::unauthorized(MSG_INVALID_TOKEN))?;
    let user = app_state.repos.users.find(|u| u.id == subject).await;
    let viewer = viewer_for(&app_state, user.as_ref(), &headers).await;
    let playlist = render_playlist(app_state.repos.channels.load().await, &viewer);
    Ok(([(header::CONTENT_TYPE, "audio/x-mpegurl")], playlist))
}

pub fn catalog_api_register() -> axum::Router<Arc<AppState>> {
    axum::Router::new()
        .route("/movies", axum::routing::get(list_movies))
        .route("/movies/{id}", axum::routing::get(get_movie))
        .route("/series", axum::routing::get(list_series))
        .route("/series/{id}", axum::routing::get(get_series))
        .route("/channels", axum::routing::get(list_channels))
        .route("/channels/playlist.m3u", axum::routing::get(channel_playlist))
        .route("/channels/{id}", axum::routing::get(get_channel))
        .route("/stream/token", axum::routing::post(stream_token))
        .route("/stream/play", axum::routing::get(play_stream))
}
