use chrono::{DateTime, Duration, Utc};
use log::{debug, info};

use crate::model::{AdBlockDetection, AdToken, AdsConfig};
use crate::repository::Repositories;
use crate::streamhub_error::StreamHubError;
use crate::tools::kv_store::{kv_get, kv_set, KeyValueStore};
use crate::utils::{constant_time_eq, generate_token, sha256_hex, MSG_INVALID_PROOF, MSG_INVALID_TOKEN, MSG_IP_MISMATCH, MSG_TOKEN_EXPIRED};

const BAIT_WEIGHT: f64 = 0.5;
const SCRIPT_BLOCKED_WEIGHT: f64 = 0.3;
const REQUEST_BLOCKED_WEIGHT: f64 = 0.2;

fn token_key(token: &str) -> String {
    format!("adtoken:{token}")
}

fn ip_key(ip: &str) -> String {
    format!("adtoken_ip:{ip}")
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdTokenResponse {
    pub token: String,
    pub challenge: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyAdRequest {
    pub token: String,
    pub challenge: String,
    pub proof: String,
}

/// Client probe results.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdBlockReport {
    #[serde(default)]
    pub bait_blocked: u32,
    #[serde(default)]
    pub bait_total: u32,
    #[serde(default)]
    pub script_blocked: bool,
    #[serde(default)]
    pub request_blocked: bool,
}

pub fn expected_proof(challenge: &str) -> String {
    sha256_hex(&format!("{challenge}{challenge}"))
}

pub fn client_score(report: &AdBlockReport) -> f64 {
    let bait_ratio = if report.bait_total == 0 {
        0.0
    } else {
        f64::from(report.bait_blocked.min(report.bait_total)) / f64::from(report.bait_total)
    };
    let mut score = bait_ratio * BAIT_WEIGHT;
    if report.script_blocked {
        score += SCRIPT_BLOCKED_WEIGHT;
    }
    if report.request_blocked {
        score += REQUEST_BLOCKED_WEIGHT;
    }
    score.min(1.0)
}

pub fn generate_ad_token(kv: &dyn KeyValueStore, cfg: &AdsConfig, ip: &str, now: DateTime<Utc>) -> AdTokenResponse {
    let ttl = Duration::seconds(cfg.token_ttl_secs);
    let token = AdToken {
        token: generate_token(16),
        challenge: generate_token(16),
        ip: ip.to_string(),
        issued_at: now,
        expires_at: now + ttl,
        verified: false,
    };
    kv_set(kv, &token_key(&token.token), &token, Some(ttl));
    kv.set(&ip_key(ip), serde_json::Value::String(token.token.clone()), Some(ttl));
    AdTokenResponse { token: token.token, challenge: token.challenge, expires_at: token.expires_at }
}

/// Checks the proof for an issued token and marks it verified.
pub fn verify_ad_loaded(kv: &dyn KeyValueStore, req: &VerifyAdRequest, ip: &str, now: DateTime<Utc>) -> Result<(), StreamHubError> {
    let key = token_key(&req.token);
    let mut token: AdToken = kv_get(kv, &key).ok_or_else(|| StreamHubError::forbidden(MSG_INVALID_TOKEN))?;
    if token.expires_at <= now {
        kv.remove(&key);
        return Err(StreamHubError::forbidden(MSG_TOKEN_EXPIRED));
    }
    if token.ip != ip {
        return Err(StreamHubError::forbidden(MSG_IP_MISMATCH));
    }
    let expected = expected_proof(&token.challenge);
    if !constant_time_eq(req.challenge.as_bytes(), token.challenge.as_bytes())
        || !constant_time_eq(req.proof.to_ascii_lowercase().as_bytes(), expected.as_bytes()) {
        return Err(StreamHubError::forbidden(MSG_INVALID_PROOF));
    }
    token.verified = true;
    let remaining = token.expires_at - now;
    kv_set(kv, &key, &token, Some(remaining));
    Ok(())
}

/// True if the latest token issued to `ip` is still unverified.
pub fn has_unverified_token(kv: &dyn KeyValueStore, ip: &str) -> bool {
    kv.get(&ip_key(ip))
        .and_then(|value| value.as_str().map(token_key))
        .and_then(|key| kv_get::<AdToken>(kv, &key))
        .is_some_and(|token| !token.verified)
}

pub async fn report_detection(cfg: &AdsConfig, repos: &Repositories, kv: &dyn KeyValueStore, user_id: Option<&str>,
                              ip: &str, report: &AdBlockReport, now: DateTime<Utc>) -> Result<AdBlockDetection, StreamHubError> {
    let score = client_score(report);
    let unverified = has_unverified_token(kv, ip);
    let detection = AdBlockDetection {
        user_id: user_id.map(String::from),
        ip: ip.to_string(),
        client_score: score,
        bait_blocked: report.bait_blocked.min(report.bait_total),
        bait_total: report.bait_total,
        token_verified: !unverified,
        detected: score >= cfg.detection_threshold || unverified,
        timestamp: now,
    };
    repos.adblock_detections.append(detection.clone(), cfg.log_size).await?;
    if detection.detected {
        info!("Ad blocker detected, score {score:.2}");
    }
    Ok(detection)
}

pub fn sweep_ad_tokens(kv: &dyn KeyValueStore, now: DateTime<Utc>) -> usize {
    let removed = kv.sweep(now);
    if removed > 0 {
        debug!("Removed {removed} expired keys");
    }
    removed
}
