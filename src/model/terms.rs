use chrono::{DateTime, Utc};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermsAcceptance {
    pub user_id: String,
    pub version: String,
    pub accepted_at: DateTime<Utc>,
    pub ip: String,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TermsStatus {
    pub current_version: String,
    pub accepted: bool,
    pub accepted_version: Option<String>,
    pub accepted_at: Option<DateTime<Utc>>,
}
