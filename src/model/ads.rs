use chrono::{DateTime, Utc};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdImpression {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub ad_id: String,
    #[serde(default)]
    pub placement: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdRefusal {
    Premium,
    HourlyCap,
    DailyCap,
    SessionCap,
}

impl std::fmt::Display for AdRefusal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", match self {
            Self::Premium => "premium",
            Self::HourlyCap => "hourly_cap",
            Self::DailyCap => "daily_cap",
            Self::SessionCap => "session_cap",
        })
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdDecision {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<AdRefusal>,
    pub hourly_count: u32,
    pub daily_count: u32,
    pub session_count: u32,
}

/// Challenge issued to the client, kept in the key value store.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdToken {
    pub token: String,
    pub challenge: String,
    pub ip: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub verified: bool,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdBlockDetection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub ip: String,
    pub client_score: f64,
    pub bait_blocked: u32,
    pub bait_total: u32,
    pub token_verified: bool,
    pub detected: bool,
    pub timestamp: DateTime<Utc>,
}
