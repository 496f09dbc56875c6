use chrono::{DateTime, Utc};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub meta: serde_json::Value,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentViews {
    pub content_id: String,
    pub views: u64,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total_events: usize,
    pub events_by_type: std::collections::BTreeMap<String, u64>,
    pub top_content: Vec<ContentViews>,
    pub unique_users_24h: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    pub users: usize,
    pub premium_users: usize,
    pub payments_by_status: std::collections::BTreeMap<String, usize>,
    pub revenue: std::collections::BTreeMap<String, f64>,
    pub open_flags: usize,
    pub scheduled_recordings: usize,
    pub movies: usize,
    pub series: usize,
    pub channels: usize,
}
