use chrono::{DateTime, Utc};

use crate::model::AgeRating;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentalControls {
    pub user_id: String,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin_hash: Option<String>,
    pub max_age_rating: AgeRating,
    #[serde(default)]
    pub blocked_genres: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl ParentalControls {
    pub fn allows(&self, age_rating: AgeRating, genres: &[String]) -> bool {
        if !self.enabled {
            return true;
        }
        age_rating <= self.max_age_rating
            && !genres.iter().any(|g| self.blocked_genres.iter().any(|b| b.eq_ignore_ascii_case(g)))
    }
}

/// Settings as returned to the client.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentalControlsDto {
    pub enabled: bool,
    pub has_pin: bool,
    pub max_age_rating: AgeRating,
    pub blocked_genres: Vec<String>,
}

impl From<&ParentalControls> for ParentalControlsDto {
    fn from(value: &ParentalControls) -> Self {
        Self {
            enabled: value.enabled,
            has_pin: value.pin_hash.is_some(),
            max_age_rating: value.max_age_rating,
            blocked_genres: value.blocked_genres.clone(),
        }
    }
}
