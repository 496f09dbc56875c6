use chrono::{DateTime, Utc};
use log::info;

use crate::model::{AccessCode, User};
use crate::repository::Repositories;
use crate::streamhub_error::StreamHubError;
use crate::utils::{generate_code, sanitize_text, MSG_CODE_ALREADY_USED, MSG_CODE_INVALID, MSG_INVALID_INPUT, MSG_USER_NOT_FOUND};

const MAX_CODES_PER_BATCH: usize = 100;
const MAX_CODE_DAYS: i64 = 3650;

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCodesRequest {
    #[serde(default = "default_code_count")]
    pub count: usize,
    pub duration_days: i64,
    #[serde(default)]
    pub note: Option<String>,
}

fn default_code_count() -> usize { 1 }

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

pub async fn generate_codes(repos: &Repositories, admin_id: &str, req: &GenerateCodesRequest, now: DateTime<Utc>) -> Result<Vec<AccessCode>, StreamHubError> {
    if !(1..=MAX_CODES_PER_BATCH).contains(&req.count) || !(1..=MAX_CODE_DAYS).contains(&req.duration_days) {
        return Err(StreamHubError::validation(MSG_INVALID_INPUT));
    }
    let note = req.note.as_deref().map(|n| sanitize_text(n, 200)).filter(|n| !n.is_empty());
    let created = repos.access_codes.update(|codes| {
        let mut created = Vec::with_capacity(req.count);
        while created.len() < req.count {
            let code = generate_code(3, 4);
            if codes.iter().any(|c| c.code == code) || created.iter().any(|c: &AccessCode| c.code == code) {
                continue;
            }
            created.push(AccessCode {
                code,
                duration_days: req.duration_days,
                used: false,
                used_by: None,
                used_at: None,
                created_at: now,
                created_by: Some(admin_id.to_string()),
                note: note.clone(),
            });
        }
        codes.extend(created.iter().cloned());
        Ok(created)
    }).await?;
    info!("Generated {} access codes of {} days", created.len(), req.duration_days);
    Ok(created)
}

pub async fn list_codes(repos: &Repositories) -> Vec<AccessCode> {
    let mut codes = repos.access_codes.load().await;
    codes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    codes
}

/// Marks the code used and extends the subscription of the user by its duration.
pub async fn redeem_code(repos: &Repositories, user_id: &str, code: &str, now: DateTime<Utc>) -> Result<(AccessCode, User), StreamHubError> {
    let code = normalize_code(code);
    if repos.users.find(|u| u.id == user_id).await.is_none() {
        return Err(StreamHubError::not_found(MSG_USER_NOT_FOUND));
    }
    let redeemed = repos.access_codes.update(|codes| {
        let access_code = codes.iter_mut().find(|c| c.code == code)
            .ok_or_else(|| StreamHubError::not_found(MSG_CODE_INVALID))?;
        if access_code.used {
            return Err(StreamHubError::validation(MSG_CODE_ALREADY_USED));
        }
        access_code.used = true;
        access_code.used_by = Some(user_id.to_string());
        access_code.used_at = Some(now);
        Ok(access_code.clone())
    }).await?;
    let user = repos.users.update(|users| {
        let user = users.iter_mut().find(|u| u.id == user_id)
            .ok_or_else(|| StreamHubError::not_found(MSG_USER_NOT_FOUND))?;
        user.extend_subscription(now, redeemed.duration_days);
        Ok(user.clone())
    }).await?;
    info!("Access code redeemed by {}", user.username);
    Ok((redeemed, user))
}

#[cfg(test)]
mod tests {
    use super::{generate_codes, list_codes, redeem_code, GenerateCodesRequest};
    use crate::model::user::tests::test_user;
    use crate::service::tests::{store_user, test_env};
    use crate::streamhub_error::StreamHubErrorKind;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_redeem_once() {
        let env = test_env();
        let now = Utc::now();
        store_user(&env, test_user("anna", now)).await;
        store_user(&env, test_user("bob", now)).await;
        let req = GenerateCodesRequest { count: 2, duration_days: 30, note: Some("<b>promo</b>".to_string()) };
        let codes = generate_codes(&env.repos, "root", &req, now).await.unwrap();
        assert_eq!(codes.len(), 2);
        assert_ne!(codes[0].code, codes[1].code);
        assert_eq!(codes[0].note.as_deref(), Some("promo"));

        let (code, user) = redeem_code(&env.repos, "anna", &codes[0].code.to_lowercase(), now).await.unwrap();
        assert!(code.used);
        assert_eq!(user.subscription_end, Some(now + Duration::days(30)));

        let err = redeem_code(&env.repos, "bob", &codes[0].code, now).await.unwrap_err();
        assert_eq!(err.kind, StreamHubErrorKind::Validation);
        assert_eq!(err.message, "Code déjà utilisé");

        let err = redeem_code(&env.repos, "bob", "AAAA-BBBB-CCCC", now).await.unwrap_err();
        assert_eq!(err.kind, StreamHubErrorKind::NotFound);
        assert_eq!(err.message, "Code invalide");
        assert_eq!(list_codes(&env.repos).await.len(), 2);
    }

    #[tokio::test]
    async fn test_generate_limits() {
        let env = test_env();
        let req = GenerateCodesRequest { count: 0, duration_days: 30, note: None };
        assert!(generate_codes(&env.repos, "root", &req, Utc::now()).await.is_err());
        let req = GenerateCodesRequest { count: 1, duration_days: 0, note: None };
        assert!(generate_codes(&env.repos, "root", &req, Utc::now()).await.is_err());
    }
}
