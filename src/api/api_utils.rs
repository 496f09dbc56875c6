use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::IntoResponse;
use log::error;

use crate::api::model::app_state::AppState;
use crate::model::User;
use crate::service::catalog_service::Viewer;
use crate::service::parental_service;
use crate::streamhub_error::StreamHubError;

pub const PARENTAL_PIN_HEADER: &str = "x-parental-pin";
const UNKNOWN_IP: &str = "unknown";

pub async fn serve_file(file_path: &Path, mime_type: mime::Mime) -> impl IntoResponse + Send {
    if file_path.exists() {
        match tokio::fs::read(file_path).await {
            Ok(content) => {
                return ([(header::CONTENT_TYPE, mime_type.to_string()), (header::CACHE_CONTROL, "no-cache".to_string())], content).into_response();
            }
            Err(err) => error!("Failed to read {}: {err}", file_path.display()),
        }
    }
    axum::http::StatusCode::NOT_FOUND.into_response()
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    let header_value = |name: &str| headers.get(name).and_then(|v: &HeaderValue| v.to_str().ok());
    header_value("x-forwarded-for")
        .and_then(|value| value.split(',').next())
        .or_else(|| header_value("x-real-ip"))
        .map(str::trim)
        .filter(|ip| ip.parse::<std::net::IpAddr>().is_ok())
        .map(String::from)
}

pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        if let Some(ip) = forwarded_ip(headers) {
            return ip;
        }
    }
    peer.map_or_else(|| UNKNOWN_IP.to_string(), |addr| addr.ip().to_string())
}

/// Client address of the request, honoring proxy headers when configured.
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

impl FromRequestParts<Arc<AppState>> for ClientIp {
    type Rejection = StreamHubError;

    async fn from_request_parts(parts: &mut Parts, app_state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let peer = parts.extensions.get::<ConnectInfo<SocketAddr>>().map(|ConnectInfo(addr)| *addr);
        Ok(Self(client_ip(&parts.headers, peer, app_state.config.security.trust_proxy_headers)))
    }
}

/// Catalog view of the requesting user with active parental controls.
pub async fn viewer_for(app_state: &AppState, user: Option<&User>, headers: &HeaderMap) -> Viewer {
    let now = chrono::Utc::now();
    let Some(user) = user else {
        return Viewer::default();
    };
    let pin = headers.get(PARENTAL_PIN_HEADER).and_then(|v| v.to_str().ok());
    Viewer {
        premium: user.is_premium(now),
        admin: user.is_admin(),
        parental: parental_service::active_filter(&app_state.repos, &user.id, pin).await,
    }
}

#[cfg(test)]
mod tests {
    use super::client_ip;
    use axum::http::{HeaderMap, HeaderValue};
    use std::net::SocketAddr;

    #[test]
    fn test_client_ip() {
        let peer: SocketAddr = "192.168.0.2:5000".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(client_ip(&headers, Some(peer), false), "192.168.0.2");
        assert_eq!(client_ip(&headers, Some(peer), true), "203.0.113.7");
        headers.insert("x-forwarded-for", HeaderValue::from_static("garbage"));
        assert_eq!(client_ip(&headers, Some(peer), true), "192.168.0.2");
        assert_eq!(client_ip(&HeaderMap::new(), None, true), "unknown");
    }
}
