use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::LazyLock;
use std::time::Duration;

use log::{debug, error};
use regex::Regex;
use serde::de::DeserializeOwned;

use crate::streamhub_error::{StreamHubError, StreamHubErrorKind};

static PASSWORD_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| Regex::new(r#"("?password"?[=:]\s*"?)[^&",}]*"#).unwrap());
static TOKEN_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| Regex::new(r"(token=)[^&]*").unwrap());
static BEARER_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| Regex::new(r"(Bearer )[A-Za-z0-9._-]+").unwrap());
static TX_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| Regex::new(r"(/tx/)[0-9a-fA-F]{8}[0-9a-fA-F]*").unwrap());

static SANITIZE_SENSITIVE_INFO: LazyLock<AtomicBool> = LazyLock::new(|| AtomicBool::new(true));

pub fn set_sanitize_sensitive_info(value: bool) {
    SANITIZE_SENSITIVE_INFO.store(value, Ordering::Relaxed);
}

pub fn sanitize_sensitive_info(query: &str) -> String {
    if SANITIZE_SENSITIVE_INFO.load(Ordering::Relaxed) {
        let masked_query = PASSWORD_REGEX.replace_all(query, "$1***");
        let masked_query = TOKEN_REGEX.replace_all(&masked_query, "$1***");
        let masked_query = BEARER_REGEX.replace_all(&masked_query, "$1***");
        let masked_query = TX_REGEX.replace_all(&masked_query, "$1***");
        masked_query.to_string()
    } else {
        query.to_string()
    }
}

pub fn create_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(15))
        .user_agent(concat!("streamhub/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|err| {
            error!("Failed to build http client, falling back to defaults {err}");
            reqwest::Client::new()
        })
}

pub async fn get_json<T: DeserializeOwned>(client: &reqwest::Client, url: &str) -> Result<T, StreamHubError> {
    debug!("Requesting {}", sanitize_sensitive_info(url));
    let response = client.get(url).send().await
        .map_err(|e| StreamHubError::new(StreamHubErrorKind::Upstream, format!("Failed to request {}: {e}", sanitize_sensitive_info(url))))?;
    if !response.status().is_success() {
        return Err(StreamHubError::new(StreamHubErrorKind::Upstream, format!("Request {} failed with status {}", sanitize_sensitive_info(url), response.status())));
    }
    response.json::<T>().await
        .map_err(|e| StreamHubError::new(StreamHubErrorKind::Upstream, format!("Failed to read response: {e}")))
}

pub async fn post_json<T: DeserializeOwned>(client: &reqwest::Client, url: &str, body: &serde_json::Value) -> Result<T, StreamHubError> {
    let response = client.post(url).json(body).send().await
        .map_err(|e| StreamHubError::new(StreamHubErrorKind::Upstream, format!("Failed to request {}: {e}", sanitize_sensitive_info(url))))?;
    if !response.status().is_success() {
        return Err(StreamHubError::new(StreamHubErrorKind::Upstream, format!("Request {} failed with status {}", sanitize_sensitive_info(url), response.status())));
    }
    response.json::<T>().await
        .map_err(|e| StreamHubError::new(StreamHubErrorKind::Upstream, format!("Failed to read response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::sanitize_sensitive_info;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_sensitive_info("/playlist.m3u?token=abc&x=1"), "/playlist.m3u?token=***&x=1");
        assert_eq!(sanitize_sensitive_info(r#"{"username":"a","password":"secret"}"#), r#"{"username":"a","password":"***"}"#);
        assert_eq!(sanitize_sensitive_info("Authorization: Bearer eyJ.abc.def"), "Authorization: Bearer ***");
        assert_eq!(sanitize_sensitive_info("https://blockstream.info/api/tx/4a5e1e4baab89f3a"), "https://blockstream.info/api/tx/***");
    }
}
