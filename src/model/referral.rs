use chrono::{DateTime, Utc};
use std::fmt::Display;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Referral {
    pub referrer_id: String,
    pub referred_id: String,
    pub code: String,
    pub reward_days: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeKind {
    /// registered while the platform was young
    EarlyAdopter,
    /// paid a subscription
    Supporter,
    /// first successful referral
    Referrer,
    /// five successful referrals
    Ambassador,
}

impl Display for BadgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", match self {
            Self::EarlyAdopter => "early_adopter",
            Self::Supporter => "supporter",
            Self::Referrer => "referrer",
            Self::Ambassador => "ambassador",
        })
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub user_id: String,
    pub badge: BadgeKind,
    pub awarded_at: DateTime<Utc>,
}
