use chrono::{DateTime, Utc};
use log::info;

use crate::model::config::Config;
use crate::model::{Badge, BadgeKind, Referral, User};
use crate::repository::Repositories;
use crate::streamhub_error::StreamHubError;
use crate::utils::{MSG_CODE_INVALID, MSG_REFERRAL_ALREADY_APPLIED, MSG_REFERRAL_SELF, MSG_USER_NOT_FOUND};

const AMBASSADOR_REFERRALS: usize = 5;

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralInfo {
    pub code: String,
    pub referrals: usize,
    pub reward_days_earned: i64,
    pub referred_by: Option<String>,
}

/// Awards the badge once, returns false if the user already holds it.
pub async fn award_badge(repos: &Repositories, user_id: &str, kind: BadgeKind, now: DateTime<Utc>) -> Result<bool, StreamHubError> {
    repos.badges.update(|badges| {
        if badges.iter().any(|b| b.user_id == user_id && b.badge == kind) {
            return Ok(false);
        }
        badges.push(Badge { user_id: user_id.to_string(), badge: kind, awarded_at: now });
        Ok(true)
    }).await
}

pub async fn list_badges(repos: &Repositories, user_id: &str) -> Vec<Badge> {
    repos.badges.filter(|b| b.user_id == user_id).await
}

/// Links `referred_id` to the owner of `code` and credits the referrer with the reward days.
pub async fn apply_referral(cfg: &Config, repos: &Repositories, referred_id: &str, code: &str, now: DateTime<Utc>) -> Result<Referral, StreamHubError> {
    let code = code.trim().to_uppercase();
    let reward_days = cfg.referral.reward_days;
    let referrer: User = repos.users.update(|users| {
        let referrer = users.iter().find(|u| u.referral_code == code)
            .ok_or_else(|| StreamHubError::not_found(MSG_CODE_INVALID))?;
        let referrer_id = referrer.id.clone();
        if referrer_id == referred_id {
            return Err(StreamHubError::validation(MSG_REFERRAL_SELF));
        }
        let referred = users.iter_mut().find(|u| u.id == referred_id)
            .ok_or_else(|| StreamHubError::not_found(MSG_USER_NOT_FOUND))?;
        if referred.referred_by.is_some() {
            return Err(StreamHubError::conflict(MSG_REFERRAL_ALREADY_APPLIED));
        }
        referred.referred_by = Some(referrer_id.clone());
        let referrer = users.iter_mut().find(|u| u.id == referrer_id)
            .ok_or_else(|| StreamHubError::not_found(MSG_CODE_INVALID))?;
        referrer.extend_subscription(now, reward_days);
        Ok(referrer.clone())
    }).await?;

    let referral = Referral {
        referrer_id: referrer.id.clone(),
        referred_id: referred_id.to_string(),
        code,
        reward_days,
        created_at: now,
    };
    let referral_count = repos.referrals.update(|referrals| {
        referrals.push(referral.clone());
        Ok(referrals.iter().filter(|r| r.referrer_id == referrer.id).count())
    }).await?;
    info!("Referral applied, {} earned {reward_days} days", referrer.username);

    award_badge(repos, &referrer.id, BadgeKind::Referrer, now).await?;
    if referral_count >= AMBASSADOR_REFERRALS {
        award_badge(repos, &referrer.id, BadgeKind::Ambassador, now).await?;
    }
    Ok(referral)
}

pub async fn referral_info(repos: &Repositories, user: &User) -> ReferralInfo {
    let referrals = repos.referrals.filter(|r| r.referrer_id == user.id).await;
    ReferralInfo {
        code: user.referral_code.clone(),
        referrals: referrals.len(),
        reward_days_earned: referrals.iter().map(|r| r.reward_days).sum(),
        referred_by: user.referred_by.clone(),
    }
}
