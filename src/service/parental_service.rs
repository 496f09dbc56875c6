use chrono::{DateTime, Utc};
use log::info;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::auth::password::{check_pin_policy, hash_password, verify_password};
use crate::model::{AgeRating, ParentalControls, ParentalControlsDto};
use crate::repository::Repositories;
use crate::streamhub_error::StreamHubError;
use crate::utils::{sanitize_text, MSG_INVALID_INPUT, MSG_INVALID_PIN, MSG_PIN_REQUIRED};

const MAX_BLOCKED_GENRES: usize = 50;

#[derive(Debug, Clone, serde::Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct UpdateParentalRequest {
    pub enabled: bool,
    /// required once a pin is set
    #[serde(default)]
    pub current_pin: Option<String>,
    /// replaces the pin
    #[serde(default)]
    pub pin: Option<String>,
    #[zeroize(skip)]
    #[serde(default)]
    pub max_age_rating: Option<AgeRating>,
    #[serde(default)]
    pub blocked_genres: Option<Vec<String>>,
}

#[derive(Debug, Clone, serde::Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct VerifyPinRequest {
    pub pin: String,
}

fn disabled(user_id: &str, now: DateTime<Utc>) -> ParentalControls {
    ParentalControls {
        user_id: user_id.to_string(),
        enabled: false,
        pin_hash: None,
        max_age_rating: AgeRating::Nc17,
        blocked_genres: vec![],
        updated_at: now,
    }
}

fn pin_matches(controls: &ParentalControls, pin: Option<&str>) -> bool {
    match (&controls.pin_hash, pin) {
        (Some(hash), Some(pin)) => verify_password(hash, pin.as_bytes()),
        _ => false,
    }
}

pub async fn get_controls(repos: &Repositories, user_id: &str) -> Option<ParentalControls> {
    repos.parental_controls.find(|p| p.user_id == user_id).await
}

pub async fn get_settings(repos: &Repositories, user_id: &str) -> ParentalControlsDto {
    let controls = get_controls(repos, user_id).await.unwrap_or_else(|| disabled(user_id, Utc::now()));
    ParentalControlsDto::from(&controls)
}

/// Changes the settings. Once a pin exists every change needs it.
/// The pin check and the write happen under one lock of the controls file.
pub async fn update_settings(repos: &Repositories, user_id: &str, req: &UpdateParentalRequest, now: DateTime<Utc>) -> Result<ParentalControlsDto, StreamHubError> {
    if let Some(pin) = req.pin.as_deref() {
        check_pin_policy(pin)?;
    }
    if req.blocked_genres.as_ref().is_some_and(|g| g.len() > MAX_BLOCKED_GENRES) {
        return Err(StreamHubError::validation(MSG_INVALID_INPUT));
    }
    let new_hash = match req.pin.as_deref() {
        Some(pin) => Some(hash_password(pin).ok_or_else(|| StreamHubError::validation(MSG_INVALID_PIN))?),
        None => None,
    };
    let blocked_genres = req.blocked_genres.as_ref()
        .map(|genres| genres.iter().map(|g| sanitize_text(g, 64)).filter(|g| !g.is_empty()).collect::<Vec<_>>());

    let controls = repos.parental_controls.update(|all| {
        let existing = all.iter().position(|p| p.user_id == user_id);
        let mut controls = match existing {
            Some(idx) => all.remove(idx),
            None => disabled(user_id, now),
        };
        if controls.pin_hash.is_some() && !pin_matches(&controls, req.current_pin.as_deref()) {
            return Err(StreamHubError::forbidden(MSG_INVALID_PIN));
        }
        if new_hash.is_some() {
            controls.pin_hash = new_hash;
        }
        if req.enabled && controls.pin_hash.is_none() {
            return Err(StreamHubError::validation(MSG_PIN_REQUIRED));
        }
        controls.enabled = req.enabled;
        if let Some(rating) = req.max_age_rating {
            controls.max_age_rating = rating;
        }
        if let Some(genres) = blocked_genres {
            controls.blocked_genres = genres;
        }
        controls.updated_at = now;
        all.push(controls.clone());
        Ok(controls)
    }).await?;
    info!("Parental controls {} for user {}", if controls.enabled { "enabled" } else { "disabled" }, user_id);
    Ok(ParentalControlsDto::from(&controls))
}

pub async fn verify_pin(repos: &Repositories, user_id: &str, pin: &str) -> bool {
    get_controls(repos, user_id).await.is_some_and(|c| pin_matches(&c, Some(pin)))
}

/// Controls that filter the catalog for this request, `None` when disabled or unlocked by a valid pin.
pub async fn active_filter(repos: &Repositories, user_id: &str, pin: Option<&str>) -> Option<ParentalControls> {
    let controls = get_controls(repos, user_id).await.filter(|c| c.enabled)?;
    if pin_matches(&controls, pin) {
        None
    } else {
        Some(controls)
    }
}

#[cfg(test)]
mod tests {
    use super::{active_filter, get_settings, update_settings, verify_pin, UpdateParentalRequest};
    use crate::model::AgeRating;
    use crate::service::tests::test_env;
    use crate::streamhub_error::StreamHubErrorKind;
    use chrono::Utc;

    fn update(enabled: bool, current_pin: Option<&str>, pin: Option<&str>) -> UpdateParentalRequest {
        UpdateParentalRequest {
            enabled,
            current_pin: current_pin.map(String::from),
            pin: pin.map(String::from),
            max_age_rating: Some(AgeRating::Pg13),
            blocked_genres: Some(vec!["Horror".to_string()]),
        }
    }

    #[tokio::test]
    async fn test_pin_gated_settings() {
        let env = test_env();
        let now = Utc::now();
        assert!(!get_settings(&env.repos, "anna").await.enabled);

        let err = update_settings(&env.repos, "anna", &update(true, None, None), now).await.unwrap_err();
        assert_eq!(err.kind, StreamHubErrorKind::Validation);
        assert!(update_settings(&env.repos, "anna", &update(true, None, Some("12a4")), now).await.is_err());

        let settings = update_settings(&env.repos, "anna", &update(true, None, Some("1234")), now).await.unwrap();
        assert!(settings.enabled && settings.has_pin);
        assert_eq!(settings.max_age_rating, AgeRating::Pg13);

        let err = update_settings(&env.repos, "anna", &update(false, Some("9999"), None), now).await.unwrap_err();
        assert_eq!(err.kind, StreamHubErrorKind::Forbidden);
        assert!(verify_pin(&env.repos, "anna", "1234").await);
        assert!(!verify_pin(&env.repos, "anna", "4321").await);

        assert!(active_filter(&env.repos, "anna", None).await.is_some());
        assert!(active_filter(&env.repos, "anna", Some("1234")).await.is_none());
        assert!(active_filter(&env.repos, "bob", None).await.is_none());

        let settings = update_settings(&env.repos, "anna", &update(false, Some("1234"), None), now).await.unwrap();
        assert!(!settings.enabled);
        assert!(active_filter(&env.repos, "anna", None).await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_updates_keep_new_pin() {
        let env = test_env();
        let now = Utc::now();
        update_settings(&env.repos, "anna", &update(true, None, Some("1111")), now).await.unwrap();

        let change_pin_req = update(true, Some("1111"), Some("2222"));
        let disable_req = update(false, Some("1111"), None);
        let (change_pin, disable) = tokio::join!(
            update_settings(&env.repos, "anna", &change_pin_req, now),
            update_settings(&env.repos, "anna", &disable_req, now),
        );
        // either order ends with the new pin, a stale write would restore the old one
        change_pin.unwrap();
        if let Err(err) = disable {
            assert_eq!(err.kind, StreamHubErrorKind::Forbidden);
        }
        assert!(verify_pin(&env.repos, "anna", "2222").await);
        assert!(!verify_pin(&env.repos, "anna", "1111").await);
        assert!(get_settings(&env.repos, "anna").await.enabled);
        assert_eq!(env.repos.parental_controls.load().await.len(), 1);
    }
}
