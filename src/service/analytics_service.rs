use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde_json::Value;

use crate::model::{AnalyticsEvent, AnalyticsSummary, ContentViews, FlagStatus, PaymentStatus, PlatformStats, RecordingStatus};
use crate::model::config::Config;
use crate::repository::Repositories;
use crate::streamhub_error::StreamHubError;
use crate::utils::{sanitize_text, MSG_INVALID_INPUT};

static EVENT_TYPE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]{0,31}$").unwrap());
const MAX_META_LEN: usize = 4096;
const TOP_CONTENT: usize = 10;
const VIEW_EVENT: &str = "view";

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackEventRequest {
    pub event_type: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub content_id: Option<String>,
    #[serde(default)]
    pub meta: Value,
}

pub async fn track(cfg: &Config, repos: &Repositories, user_id: Option<&str>, req: &TrackEventRequest, now: DateTime<Utc>) -> Result<AnalyticsEvent, StreamHubError> {
    if !EVENT_TYPE_REGEX.is_match(&req.event_type) {
        return Err(StreamHubError::validation(MSG_INVALID_INPUT));
    }
    if !(req.meta.is_null() || req.meta.is_object()) || req.meta.to_string().len() > MAX_META_LEN {
        return Err(StreamHubError::validation(MSG_INVALID_INPUT));
    }
    let clean = |value: &Option<String>| value.as_deref().map(|v| sanitize_text(v, 128)).filter(|v| !v.is_empty());
    let event = AnalyticsEvent {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.map(String::from),
        session_id: clean(&req.session_id),
        event_type: req.event_type.clone(),
        content_id: clean(&req.content_id),
        timestamp: now,
        meta: req.meta.clone(),
    };
    repos.analytics_events.append(event.clone(), cfg.analytics.max_events).await?;
    Ok(event)
}

pub fn summary(events: &[AnalyticsEvent], now: DateTime<Utc>) -> AnalyticsSummary {
    let mut events_by_type = BTreeMap::new();
    let mut views: HashMap<&str, u64> = HashMap::new();
    let mut users = HashSet::new();
    let day_ago = now - Duration::hours(24);
    for event in events {
        *events_by_type.entry(event.event_type.clone()).or_insert(0u64) += 1;
        if event.event_type == VIEW_EVENT {
            if let Some(content_id) = event.content_id.as_deref() {
                *views.entry(content_id).or_default() += 1;
            }
        }
        if event.timestamp > day_ago {
            if let Some(user_id) = event.user_id.as_deref() {
                users.insert(user_id);
            }
        }
    }
    let mut top_content: Vec<ContentViews> = views.into_iter()
        .map(|(content_id, views)| ContentViews { content_id: content_id.to_string(), views })
        .collect();
    top_content.sort_by(|a, b| b.views.cmp(&a.views).then_with(|| a.content_id.cmp(&b.content_id)));
    top_content.truncate(TOP_CONTENT);
    AnalyticsSummary { total_events: events.len(), events_by_type, top_content, unique_users_24h: users.len() }
}

pub async fn analytics_summary(repos: &Repositories, now: DateTime<Utc>) -> AnalyticsSummary {
    summary(&repos.analytics_events.load().await, now)
}

pub async fn stats(repos: &Repositories, now: DateTime<Utc>) -> PlatformStats {
    let users = repos.users.load().await;
    let payments = repos.payments.load().await;
    let mut payments_by_status = BTreeMap::new();
    let mut revenue = BTreeMap::new();
    for payment in &payments {
        let status = match payment.status {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Confirmed => "confirmed",
            PaymentStatus::Expired => "expired",
        };
        *payments_by_status.entry(status.to_string()).or_insert(0) += 1;
        if payment.status == PaymentStatus::Confirmed {
            *revenue.entry(payment.currency.to_string()).or_insert(0.0) += payment.crypto_amount;
        }
    }
    PlatformStats {
        users: users.len(),
        premium_users: users.iter().filter(|u| u.is_premium(now)).count(),
        payments_by_status,
        revenue,
        open_flags: repos.moderation_flags.filter(|f| f.status == FlagStatus::Open).await.len(),
        scheduled_recordings: repos.recordings.filter(|r| r.status == RecordingStatus::Scheduled).await.len(),
        movies: repos.movies.load().await.len(),
        series: repos.series.load().await.len(),
        channels: repos.channels.load().await.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::{stats, summary, track, TrackEventRequest};
    use crate::model::user::tests::test_user;
    use crate::model::AnalyticsEvent;
    use crate::service::tests::{store_user, test_env};
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn event(user: &str, kind: &str, content: Option<&str>, hours_ago: i64) -> AnalyticsEvent {
        AnalyticsEvent {
            id: format!("{user}-{kind}-{hours_ago}"),
            user_id: Some(user.to_string()),
            session_id: None,
            event_type: kind.to_string(),
            content_id: content.map(String::from),
            timestamp: Utc::now() - Duration::hours(hours_ago),
            meta: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_summary() {
        let events = vec![
            event("a", "view", Some("m1"), 1),
            event("b", "view", Some("m1"), 2),
            event("c", "view", Some("m2"), 30),
            event("a", "search", None, 1),
        ];
        let result = summary(&events, Utc::now());
        assert_eq!(result.total_events, 4);
        assert_eq!(result.events_by_type.get("view"), Some(&3));
        assert_eq!(result.top_content[0].content_id, "m1");
        assert_eq!(result.top_content[0].views, 2);
        assert_eq!(result.unique_users_24h, 2);
    }

    #[tokio::test]
    async fn test_track_truncates_log() {
        let mut env = test_env();
        env.cfg.analytics.max_events = 3;
        let now = Utc::now();
        for i in 0..5 {
            let req = TrackEventRequest { event_type: "view".to_string(), session_id: None, content_id: Some(format!("m{i}")), meta: json!({"position": i}) };
            track(&env.cfg, &env.repos, Some("anna"), &req, now).await.unwrap();
        }
        let events = env.repos.analytics_events.load().await;
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].content_id.as_deref(), Some("m2"));

        let bad = TrackEventRequest { event_type: "Bad Type".to_string(), session_id: None, content_id: None, meta: json!(null) };
        assert!(track(&env.cfg, &env.repos, None, &bad, now).await.is_err());
        let big = TrackEventRequest { event_type: "view".to_string(), session_id: None, content_id: None, meta: json!({"x": "y".repeat(5000)}) };
        assert!(track(&env.cfg, &env.repos, None, &big, now).await.is_err());
    }

    #[tokio::test]
    async fn test_stats_counts() {
        let env = test_env();
        let now = Utc::now();
        let mut premium = test_user("anna", now);
        premium.extend_subscription(now, 30);
        store_user(&env, premium).await;
        store_user(&env, test_user("bob", now)).await;
        let result = stats(&env.repos, now).await;
        assert_eq!(result.users, 2);
        assert_eq!(result.premium_users, 1);
        assert!(result.payments_by_status.is_empty());
    }
}
