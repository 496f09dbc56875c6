use chrono::{DateTime, Duration, Utc};

use crate::model::{AdDecision, AdImpression, AdRefusal, AdsConfig};
use crate::repository::Repositories;
use crate::streamhub_error::{StreamHubError, StreamHubErrorKind};
use crate::utils::{debug_if_enabled, sanitize_text};

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub placement: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpressionRequest {
    pub ad_id: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub placement: Option<String>,
}

fn count(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Frequency cap decision over the impression log.
pub fn decide(cfg: &AdsConfig, impressions: &[AdImpression], premium: bool, user_id: &str,
              session_id: Option<&str>, now: DateTime<Utc>) -> AdDecision {
    let hour_ago = now - Duration::hours(1);
    let day_ago = now - Duration::days(1);
    let own = || impressions.iter().filter(|i| i.user_id == user_id);
    let hourly_count = count(own().filter(|i| i.timestamp > hour_ago).count());
    let daily_count = count(own().filter(|i| i.timestamp > day_ago).count());
    let session_count = session_id.map_or(0, |sid| count(own().filter(|i| i.session_id.as_deref() == Some(sid)).count()));

    let reason = if premium {
        Some(AdRefusal::Premium)
    } else if hourly_count >= cfg.hourly_cap {
        Some(AdRefusal::HourlyCap)
    } else if daily_count >= cfg.daily_cap {
        Some(AdRefusal::DailyCap)
    } else if session_id.is_some() && session_count >= cfg.session_cap {
        Some(AdRefusal::SessionCap)
    } else {
        None
    };
    AdDecision { allowed: reason.is_none(), reason, hourly_count, daily_count, session_count }
}

pub async fn request_ad(cfg: &AdsConfig, repos: &Repositories, premium: bool, user_id: &str,
                        session_id: Option<&str>, now: DateTime<Utc>) -> AdDecision {
    let impressions = repos.ad_impressions.load().await;
    decide(cfg, &impressions, premium, user_id, session_id, now)
}

/// Logs an impression if the cap allows it, a refused impression fails with 429.
pub async fn record_impression(cfg: &AdsConfig, repos: &Repositories, premium: bool, user_id: &str,
                               req: &ImpressionRequest, now: DateTime<Utc>) -> Result<AdDecision, StreamHubError> {
    let ad_id = sanitize_text(&req.ad_id, 64);
    if ad_id.is_empty() {
        return Err(StreamHubError::validation(crate::utils::MSG_INVALID_INPUT));
    }
    let session_id = req.session_id.as_deref().map(|s| sanitize_text(s, 64)).filter(|s| !s.is_empty());
    let decision = repos.ad_impressions.update(|impressions| {
        let decision = decide(cfg, impressions, premium, user_id, session_id.as_deref(), now);
        if let Some(reason) = decision.reason {
            return Err(StreamHubError::new(StreamHubErrorKind::TooManyRequests, reason.to_string()));
        }
        impressions.push(AdImpression {
            user_id: user_id.to_string(),
            session_id: session_id.clone(),
            ad_id: ad_id.clone(),
            placement: req.placement.as_deref().map(|p| sanitize_text(p, 32)).unwrap_or_default(),
            timestamp: now,
        });
        if cfg.log_size > 0 && impressions.len() > cfg.log_size {
            let excess = impressions.len() - cfg.log_size;
            impressions.drain(..excess);
        }
        Ok(AdDecision {
            hourly_count: decision.hourly_count + 1,
            daily_count: decision.daily_count + 1,
            session_count: decision.session_count + u32::from(session_id.is_some()),
            ..decision
        })
    }).await?;
    debug_if_enabled!("Ad impression {} for {}", ad_id, user_id);
    Ok(decision)
}

#[cfg(test)]
mod tests {
    use super::{decide, record_impression, ImpressionRequest};
    use crate::model::{AdImpression, AdRefusal, AdsConfig};
    use crate::service::tests::test_env;
    use crate::streamhub_error::StreamHubErrorKind;
    use chrono::{Duration, Utc};

    fn impression(user_id: &str, session: &str, minutes_ago: i64) -> AdImpression {
        AdImpression {
            user_id: user_id.to_string(),
            session_id: Some(session.to_string()),
            ad_id: "ad1".to_string(),
            placement: String::new(),
            timestamp: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[test]
    fn test_cap_order() {
        let cfg = AdsConfig::default();
        let now = Utc::now();
        assert_eq!(decide(&cfg, &[], true, "u", None, now).reason, Some(AdRefusal::Premium));
        assert!(decide(&cfg, &[], false, "u", None, now).allowed);

        let daily: Vec<_> = (0..40).map(|i| impression("u", &format!("s{i}"), 70 + i)).collect();
        assert_eq!(decide(&cfg, &daily, false, "u", None, now).reason, Some(AdRefusal::DailyCap));
        assert!(decide(&cfg, &daily, false, "other", None, now).allowed);

        let session: Vec<_> = (0..15).map(|i| impression("u", "s", 90 + i * 10)).collect();
        let decision = decide(&cfg, &session, false, "u", Some("s"), now);
        assert_eq!(decision.reason, Some(AdRefusal::SessionCap));
        assert!(decide(&cfg, &session, false, "u", Some("fresh"), now).allowed);
    }

    #[tokio::test]
    async fn test_eleventh_impression_in_hour_refused() {
        let env = test_env();
        let now = Utc::now();
        let req = ImpressionRequest { ad_id: "ad-7".to_string(), session_id: None, placement: Some("preroll".to_string()) };
        for i in 0..10 {
            let decision = record_impression(&env.cfg.ads, &env.repos, false, "anna", &req, now).await.unwrap();
            assert_eq!(decision.hourly_count, i + 1);
        }
        let err = record_impression(&env.cfg.ads, &env.repos, false, "anna", &req, now).await.unwrap_err();
        assert_eq!(err.kind, StreamHubErrorKind::TooManyRequests);
        assert_eq!(err.message, "hourly_cap");
        assert_eq!(env.repos.ad_impressions.load().await.len(), 10);

        let later = now + Duration::minutes(61);
        assert!(record_impression(&env.cfg.ads, &env.repos, false, "anna", &req, later).await.is_ok());
    }
}
