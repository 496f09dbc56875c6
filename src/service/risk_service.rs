use std::net::IpAddr;

use axum::http::HeaderMap;

use crate::model::config::Config;
use crate::utils::network::geo::{lookup_ip, GeoLocation};
use crate::utils::{sanitize_text, sha256_hex};

pub const VPN_THRESHOLD: f64 = 0.5;
pub const ANOMALY_WARN_THRESHOLD: f64 = 0.6;

const HOSTING_WEIGHT: f64 = 0.4;
const PROXY_WEIGHT: f64 = 0.4;
const TIMEZONE_WEIGHT: f64 = 0.25;
const PROXY_HEADER_WEIGHT: f64 = 0.15;
const WEBRTC_WEIGHT: f64 = 0.3;

const NEW_DEVICE_WEIGHT: f64 = 0.4;
const COUNTRY_CHANGE_WEIGHT: f64 = 0.35;
const VPN_WEIGHT: f64 = 0.25;

const MAX_COMPONENTS: usize = 32;

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityCheckRequest {
    /// client side fingerprint components (screen, platform, canvas hash ...)
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub webrtc_ip: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VpnIndicators {
    pub hosting: bool,
    pub proxy: bool,
    pub timezone_mismatch: bool,
    pub proxy_headers: bool,
    pub webrtc_mismatch: bool,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityReport {
    pub fingerprint: String,
    pub vpn_score: f64,
    pub is_vpn: bool,
    pub indicators: VpnIndicators,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers.get(name).and_then(|v| v.to_str().ok()).unwrap_or_default()
}

pub fn device_fingerprint(user_agent: &str, accept_language: &str, components: &[String]) -> String {
    let mut parts = vec![user_agent.to_string(), accept_language.to_string()];
    parts.extend(components.iter().take(MAX_COMPONENTS).map(|c| sanitize_text(c, 256)));
    sha256_hex(&parts.join("|"))
}

pub fn fingerprint_from_headers(headers: &HeaderMap, components: &[String]) -> String {
    device_fingerprint(header_str(headers, "user-agent"), header_str(headers, "accept-language"), components)
}

/// `via` or a multi hop `x-forwarded-for`.
pub fn has_proxy_headers(headers: &HeaderMap) -> bool {
    headers.contains_key("via") || header_str(headers, "x-forwarded-for").contains(',')
}

pub fn collect_indicators(headers: &HeaderMap, ip: &str, geo: Option<&GeoLocation>, client_tz: Option<&str>, webrtc_ip: Option<&str>) -> VpnIndicators {
    let timezone_mismatch = match (geo.and_then(|g| g.timezone.as_deref()), client_tz) {
        (Some(geo_tz), Some(tz)) => !tz.trim().is_empty() && !geo_tz.eq_ignore_ascii_case(tz.trim()),
        _ => false,
    };
    let webrtc_mismatch = webrtc_ip
        .and_then(|w| w.trim().parse::<IpAddr>().ok())
        .is_some_and(|w| ip.parse::<IpAddr>().is_ok_and(|ip| ip != w));
    VpnIndicators {
        hosting: geo.is_some_and(|g| g.hosting),
        proxy: geo.is_some_and(|g| g.proxy),
        timezone_mismatch,
        proxy_headers: has_proxy_headers(headers),
        webrtc_mismatch,
    }
}

pub fn vpn_score(indicators: &VpnIndicators) -> f64 {
    let weights = [
        (indicators.hosting, HOSTING_WEIGHT),
        (indicators.proxy, PROXY_WEIGHT),
        (indicators.timezone_mismatch, TIMEZONE_WEIGHT),
        (indicators.proxy_headers, PROXY_HEADER_WEIGHT),
        (indicators.webrtc_mismatch, WEBRTC_WEIGHT),
    ];
    weights.iter().filter(|(set, _)| *set).map(|(_, w)| w).sum::<f64>().min(1.0)
}

pub fn anomaly_score(new_device: bool, country_changed: bool, vpn: bool) -> f64 {
    let mut score = 0.0;
    if new_device {
        score += NEW_DEVICE_WEIGHT;
    }
    if country_changed {
        score += COUNTRY_CHANGE_WEIGHT;
    }
    if vpn {
        score += VPN_WEIGHT;
    }
    score
}

pub async fn geolocate(cfg: &Config, client: &reqwest::Client, ip: &str) -> Option<GeoLocation> {
    if !cfg.security.geo_lookup {
        return None;
    }
    let addr = ip.parse::<IpAddr>().ok()?;
    lookup_ip(client, &cfg.security.geo_url, &addr).await
}

pub async fn check(cfg: &Config, client: &reqwest::Client, headers: &HeaderMap, ip: &str, req: &SecurityCheckRequest) -> SecurityReport {
    let geo = geolocate(cfg, client, ip).await;
    let indicators = collect_indicators(headers, ip, geo.as_ref(), req.timezone.as_deref(), req.webrtc_ip.as_deref());
    let score = vpn_score(&indicators);
    SecurityReport {
        fingerprint: fingerprint_from_headers(headers, &req.components),
        vpn_score: score,
        is_vpn: score >= VPN_THRESHOLD,
        indicators,
        country: geo.and_then(|g| g.country_code),
    }
}

#[cfg(test)]
mod tests {
    use super::{anomaly_score, collect_indicators, device_fingerprint, has_proxy_headers, vpn_score, VpnIndicators, ANOMALY_WARN_THRESHOLD, VPN_THRESHOLD};
    use crate::utils::network::geo::GeoLocation;
    use axum::http::{HeaderMap, HeaderValue};

    #[test]
    fn test_fingerprint_stable() {
        let a = device_fingerprint("Mozilla/5.0", "fr-FR", &["1920x1080".to_string()]);
        assert_eq!(a, device_fingerprint("Mozilla/5.0", "fr-FR", &["1920x1080".to_string()]));
        assert_ne!(a, device_fingerprint("Mozilla/5.0", "en-US", &["1920x1080".to_string()]));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_vpn_score() {
        assert!(vpn_score(&VpnIndicators::default()).abs() < f64::EPSILON);
        let hosting = VpnIndicators { hosting: true, ..VpnIndicators::default() };
        assert!(vpn_score(&hosting) < VPN_THRESHOLD);
        let tunnel = VpnIndicators { hosting: true, webrtc_mismatch: true, ..VpnIndicators::default() };
        assert!(vpn_score(&tunnel) >= VPN_THRESHOLD);
        let all = VpnIndicators { hosting: true, proxy: true, timezone_mismatch: true, proxy_headers: true, webrtc_mismatch: true };
        assert!((vpn_score(&all) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_indicators() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("1.2.3.4, 10.0.0.1"));
        assert!(has_proxy_headers(&headers));
        let geo = GeoLocation { timezone: Some("Europe/Paris".to_string()), hosting: true, ..GeoLocation::default() };
        let indicators = collect_indicators(&headers, "1.2.3.4", Some(&geo), Some("America/New_York"), Some("5.6.7.8"));
        assert!(indicators.hosting && indicators.timezone_mismatch && indicators.webrtc_mismatch && indicators.proxy_headers);
        let same = collect_indicators(&HeaderMap::new(), "1.2.3.4", Some(&geo), Some("Europe/Paris"), Some("1.2.3.4"));
        assert!(!same.timezone_mismatch && !same.webrtc_mismatch && !same.proxy_headers);
    }

    #[test]
    fn test_anomaly_threshold() {
        assert!(anomaly_score(true, false, false) < ANOMALY_WARN_THRESHOLD);
        assert!(anomaly_score(true, true, false) >= ANOMALY_WARN_THRESHOLD);
        assert!(anomaly_score(true, false, true) >= ANOMALY_WARN_THRESHOLD);
        assert!(anomaly_score(false, false, true) < ANOMALY_WARN_THRESHOLD);
    }
}
