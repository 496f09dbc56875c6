use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::api::api_utils::serve_file;
use crate::api::model::app_state::AppState;

async fn index(
    State(app_state): State<Arc<AppState>>,
) -> impl IntoResponse + Send {
    let path: PathBuf = [&app_state.config.api.web_root, "index.html"].iter().collect();
    serve_file(&path, mime::TEXT_HTML_UTF_8).await.into_response()
}

async fn health(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "recordings": app_state.recorder.running().await,
    }))
}

pub fn health_register() -> axum::Router<Arc<AppState>> {
    axum::Router::new().route("/health", axum::routing::get(health))
}

pub fn index_register(web_dir_path: &Path) -> axum::Router<Arc<AppState>> {
    axum::Router::new()
        .route("/", axum::routing::get(index))
        .fallback_service(tower_http::services::ServeDir::new(web_dir_path))
}
