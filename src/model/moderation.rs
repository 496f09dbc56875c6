use chrono::{DateTime, Utc};

use crate::model::ContentKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagReason {
    Inappropriate,
    Copyright,
    Broken,
    Spam,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagStatus {
    Open,
    Dismissed,
    Actioned,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationFlag {
    pub id: String,
    pub content_id: String,
    pub content_kind: ContentKind,
    pub reporter_id: String,
    pub reason: FlagReason,
    #[serde(default)]
    pub details: String,
    pub status: FlagStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
}
