use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use log::{error, info, warn};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::api::endpoints::account_api::account_api_register;
use crate::api::endpoints::admin_api::admin_api_register;
use crate::api::endpoints::ads_api::ads_api_register;
use crate::api::endpoints::analytics_api::analytics_api_register;
use crate::api::endpoints::auth_api::auth_api_register;
use crate::api::endpoints::catalog_api::catalog_api_register;
use crate::api::endpoints::moderation_api::moderation_api_register;
use crate::api::endpoints::payment_api::payment_api_register;
use crate::api::endpoints::recording_api::recording_api_register;
use crate::api::endpoints::web_index::{health_register, index_register};
use crate::api::middleware::{rate_limit, security_headers};
use crate::api::model::app_state::AppState;
use crate::api::scheduler::spawn_schedulers;
use crate::api::api_utils::PARENTAL_PIN_HEADER;
use crate::model::config::Config;
use crate::repository::Repositories;
use crate::service::recording_service::RecorderManager;
use crate::service::user_service;
use crate::tools::kv_store::MemoryStore;
use crate::utils::file::file_lock_manager::FileLockManager;
use crate::utils::network::request::create_client;
use crate::utils::KV_SNAPSHOT_FILE;

fn create_cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
            header::HeaderName::from_static(PARENTAL_PIN_HEADER),
        ]);
    if origins.is_empty() || origins.iter().any(|o| o.trim() == "*") {
        return cors.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins.iter()
        .filter_map(|o| HeaderValue::from_str(o.trim()).ok())
        .collect();
    cors.allow_origin(AllowOrigin::list(allowed))
}

fn create_app_state(cfg: Arc<Config>) -> Arc<AppState> {
    let kv = MemoryStore::load(&cfg.data_file(KV_SNAPSHOT_FILE));
    let repos = Repositories::new(&cfg, &FileLockManager::new());
    Arc::new(AppState {
        http_client: Arc::new(create_client()),
        repos: Arc::new(repos),
        kv: Arc::new(kv),
        recorder: Arc::new(RecorderManager::new()),
        config: cfg,
    })
}

fn create_router(app_state: &Arc<AppState>, web_dir_path: &std::path::Path) -> axum::Router {
    let api = axum::Router::new()
        .merge(auth_api_register())
        .merge(catalog_api_register())
        .merge(payment_api_register())
        .merge(account_api_register())
        .merge(ads_api_register())
        .merge(moderation_api_register())
        .merge(recording_api_register())
        .merge(analytics_api_register())
        .nest("/admin", admin_api_register(Arc::clone(app_state)))
        .route_layer(axum::middleware::from_fn_with_state(Arc::clone(app_state), rate_limit))
        .merge(health_register());

    let mut router = axum::Router::new()
        .nest("/api", api)
        .merge(index_register(web_dir_path))
        .layer(create_cors_layer(&app_state.config.api.cors_origins));
    for layer in security_headers() {
        router = router.layer(layer);
    }
    router.with_state(Arc::clone(app_state))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {err}");
    }
    info!("Shutdown requested");
}

pub async fn start_server(cfg: Arc<Config>) -> std::io::Result<()> {
    let host = cfg.api.host.to_string();
    let port = cfg.api.port;
    let web_dir_path = PathBuf::from(&cfg.api.web_root);
    if !web_dir_path.is_dir() {
        return Err(std::io::Error::new(ErrorKind::NotFound, format!("web_root does not exists or is not an directory: {}", web_dir_path.display())));
    }

    let app_state = create_app_state(cfg);
    for name in user_service::unclaimed_admin_users(&app_state.config, &app_state.repos).await {
        warn!("Admin user '{name}' is not registered yet, the first registration with this name gets the admin role");
    }
    spawn_schedulers(&app_state);
    let router = create_router(&app_state, &web_dir_path);

    info!("Server running: http://{host}:{port}");
    let listener = tokio::net::TcpListener::bind(format!("{host}:{port}")).await?;
    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    app_state.recorder.stop_all().await;
    let snapshot = app_state.config.data_file(KV_SNAPSHOT_FILE);
    if let Err(err) = app_state.kv.snapshot(&snapshot) {
        error!("Failed to write kv snapshot {}: {err}", snapshot.display());
    }
    info!("Server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use chrono::Utc;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::create_router;
    use crate::api::model::app_state::AppState;
    use crate::auth::authenticator::create_jwt;
    use crate::model::config::Config;
    use crate::model::user::tests::test_user;
    use crate::model::AgeRating;
    use crate::service::adblock_service::expected_proof;
    use crate::service::catalog_service::tests::test_movie;
    use crate::service::recording_service::RecorderManager;
    use crate::service::tests::test_env;
    use crate::tools::kv_store::MemoryStore;

    struct TestServer {
        router: axum::Router,
        state: Arc<AppState>,
        _dir: tempfile::TempDir,
    }

    fn test_server(configure: impl FnOnce(&mut Config)) -> TestServer {
        let (mut cfg, repos, dir) = test_env().into_parts();
        configure(&mut cfg);
        let web_dir = cfg.t_data_path.clone();
        let state = Arc::new(AppState {
            config: Arc::new(cfg),
            http_client: Arc::new(reqwest::Client::new()),
            repos: Arc::new(repos),
            kv: Arc::new(MemoryStore::new()),
            recorder: Arc::new(RecorderManager::new()),
        });
        let router = create_router(&state, &web_dir);
        TestServer { router, state, _dir: dir }
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str, body: &Value, bearer: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn send(server: &TestServer, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
        let response = server.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let location = response.headers().get(header::LOCATION).map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, location, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_rate_limit() {
        let server = test_server(|cfg| {
            cfg.security.rate_limit_max_requests = 2;
            cfg.security.rate_limit_window_secs = 60;
        });
        assert_eq!(send(&server, get("/api/movies")).await.0, StatusCode::OK);
        assert_eq!(send(&server, get("/api/series")).await.0, StatusCode::OK);
        let (status, _, body) = send(&server, get("/api/movies")).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert!(body["error"].is_string());
        assert_eq!(send(&server, get("/api/health")).await.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_impression_hourly_cap() {
        let server = test_server(|cfg| cfg.ads.hourly_cap = 1);
        let impression = json!({"adId": "banner-1"});
        let (status, _, body) = send(&server, post("/api/ads/impression", &impression, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["allowed"], json!(true));

        let (status, _, body) = send(&server, post("/api/ads/impression", &impression, None)).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["allowed"], json!(false));
        assert_eq!(body["reason"], json!("hourly_cap"));
    }

    #[tokio::test]
    async fn test_adblock_verify_status() {
        let server = test_server(|_| {});
        let forged = json!({"token": "unknown", "challenge": "c", "proof": "p"});
        assert_eq!(send(&server, post("/api/adblock/verify", &forged, None)).await.0, StatusCode::FORBIDDEN);

        let (_, _, issued) = send(&server, post("/api/adblock/token", &json!({}), None)).await;
        let token = issued["token"].as_str().unwrap();
        let challenge = issued["challenge"].as_str().unwrap();
        let wrong = json!({"token": token, "challenge": challenge, "proof": "00"});
        assert_eq!(send(&server, post("/api/adblock/verify", &wrong, None)).await.0, StatusCode::FORBIDDEN);
        let proof = json!({"token": token, "challenge": challenge, "proof": expected_proof(challenge)});
        assert_eq!(send(&server, post("/api/adblock/verify", &proof, None)).await.0, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_stream_token_gates_playback() {
        let server = test_server(|_| {});
        let now = Utc::now();
        let mut paid = test_movie("paid", "Paid", 2001, AgeRating::G);
        paid.premium_only = true;
        let free = test_movie("free", "Free", 2002, AgeRating::G);
        server.state.repos.movies.update(|movies| {
            movies.push(paid);
            movies.push(free);
            Ok(())
        }).await.unwrap();
        let mut anna = test_user("anna", now);
        anna.extend_subscription(now, 30);
        server.state.repos.users.update(|users| { users.push(anna.clone()); Ok(()) }).await.unwrap();
        let jwt = create_jwt(&server.state.config.web_auth, &anna, now).unwrap();
        let views = |id: &'static str| {
            let state = Arc::clone(&server.state);
            async move { state.repos.movies.find(|m| m.id == id).await.unwrap().views }
        };

        let (status, _, _) = send(&server, post("/api/stream/token", &json!({"kind": "movie", "id": "paid"}), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(views("paid").await, 0);

        let (status, _, body) = send(&server, post("/api/stream/token", &json!({"kind": "movie", "id": "paid"}), Some(&jwt))).await;
        assert_eq!(status, StatusCode::OK);
        let play_url = body["url"].as_str().unwrap().to_string();
        assert!(play_url.starts_with("/api/stream/play?"));
        assert!(!body.to_string().contains("cdn.example.org"));
        assert_eq!(views("paid").await, 0);

        let (status, location, _) = send(&server, get(&play_url)).await;
        assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location.as_deref(), Some("https://cdn.example.org/paid.m3u8"));
        assert_eq!(views("paid").await, 1);

        let other = play_url.replace("id=paid", "id=free");
        assert_eq!(send(&server, get(&other)).await.0, StatusCode::UNAUTHORIZED);
        assert_eq!(send(&server, get("/api/stream/play?kind=movie&id=free&token=bogus")).await.0, StatusCode::UNAUTHORIZED);
        assert_eq!(views("free").await, 0);
    }

    #[tokio::test]
    async fn test_playlist_token() {
        let server = test_server(|_| {});
        let (status, _, body) = send(&server, post("/api/stream/token", &json!({"kind": "channel"}), None)).await;
        assert_eq!(status, StatusCode::OK);
        let url = body["url"].as_str().unwrap();
        assert!(url.starts_with("/api/channels/playlist.m3u?token="));
        let response = server.router.clone().oneshot(get(url)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"#EXTM3U"));

        let (status, _, _) = send(&server, post("/api/stream/token", &json!({"kind": "movie"}), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
