use chrono::{DateTime, Utc};
use log::{info, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::auth::login_guard::LoginGuard;
use crate::auth::password::{check_password_policy, hash_password, verify_password};
use crate::model::config::Config;
use crate::model::{BadgeKind, Role, User};
use crate::repository::Repositories;
use crate::service::referral_service;
use crate::service::risk_service::{anomaly_score, ANOMALY_WARN_THRESHOLD};
use crate::streamhub_error::{StreamHubError, StreamHubErrorKind};
use crate::tools::kv_store::KeyValueStore;
use crate::utils::{generate_code, is_valid_email, is_valid_username, MSG_INVALID_CREDENTIALS,
                   MSG_INVALID_EMAIL, MSG_INVALID_USERNAME, MSG_USER_EXISTS, MSG_USER_NOT_FOUND};

/// Registrations up to this count receive the early adopter badge.
const EARLY_ADOPTER_LIMIT: usize = 100;
const MAX_KNOWN_FINGERPRINTS: usize = 10;

#[derive(Debug, Clone, serde::Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub referral_code: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// email or username
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, serde::Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Request facts used to score a login.
#[derive(Debug, Clone, Default)]
pub struct LoginContext {
    pub ip: String,
    pub fingerprint: Option<String>,
    pub country: Option<String>,
    pub vpn: bool,
}

pub async fn register(cfg: &Config, repos: &Repositories, req: &RegisterRequest, now: DateTime<Utc>) -> Result<User, StreamHubError> {
    let email = req.email.trim().to_lowercase();
    let username = req.username.trim().to_string();
    if !is_valid_email(&email) {
        return Err(StreamHubError::validation(MSG_INVALID_EMAIL));
    }
    if !is_valid_username(&username) {
        return Err(StreamHubError::validation(MSG_INVALID_USERNAME));
    }
    check_password_policy(&req.password)?;
    let password_hash = hash_password(&req.password)
        .ok_or_else(|| StreamHubError::new(StreamHubErrorKind::Info, "Failed to hash password".to_string()))?;

    let role = if cfg.web_auth.is_admin_user(&username) { Role::Admin } else { Role::User };
    let (user, user_count) = repos.users.update(|users| {
        if users.iter().any(|u| u.email == email || u.username.eq_ignore_ascii_case(&username)) {
            return Err(StreamHubError::conflict(MSG_USER_EXISTS));
        }
        let mut referral_code = generate_code(2, 4);
        while users.iter().any(|u| u.referral_code == referral_code) {
            referral_code = generate_code(2, 4);
        }
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.clone(),
            username: username.clone(),
            password_hash,
            role,
            premium: false,
            subscription_start: None,
            subscription_end: None,
            referral_code,
            referred_by: None,
            created_at: now,
            last_login_at: None,
            last_country: None,
            known_fingerprints: vec![],
        };
        users.push(user.clone());
        Ok((user, users.len()))
    }).await?;
    info!("Registered user {} ({})", user.username, user.role);

    if user_count <= EARLY_ADOPTER_LIMIT {
        referral_service::award_badge(repos, &user.id, BadgeKind::EarlyAdopter, now).await?;
    }
    if let Some(code) = req.referral_code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        if let Err(err) = referral_service::apply_referral(cfg, repos, &user.id, code, now).await {
            warn!("Referral code {code} ignored for {}: {err}", user.username);
        }
    }
    Ok(user)
}

/// Configured admin usernames nobody registered yet. The first registration
/// with such a name gets the admin role.
pub async fn unclaimed_admin_users(cfg: &Config, repos: &Repositories) -> Vec<String> {
    let users = repos.users.load().await;
    cfg.web_auth.admin_users.iter()
        .filter(|name| !users.iter().any(|u| u.username.eq_ignore_ascii_case(name)))
        .cloned()
        .collect()
}

fn matches_login(user: &User, login: &str) -> bool {
    user.email.eq_ignore_ascii_case(login) || user.username.eq_ignore_ascii_case(login)
}

/// Checks the credentials, guarded per client ip. Returns the user and the login anomaly score.
pub async fn login(cfg: &Config, repos: &Repositories, kv: &dyn KeyValueStore, req: &LoginRequest,
                   ctx: &LoginContext, now: DateTime<Utc>) -> Result<(User, f64), StreamHubError> {
    let guard = LoginGuard::new(kv, cfg.security.login_max_attempts, cfg.security.login_window_mins);
    guard.check(&ctx.ip, now)?;

    let login = req.login.trim();
    let candidate = repos.users.find(|u| matches_login(u, login)).await;
    let Some(candidate) = candidate.filter(|u| verify_password(&u.password_hash, req.password.as_bytes())) else {
        guard.record_failure(&ctx.ip, now);
        warn!("Failed login for {login} from {}", ctx.ip);
        return Err(StreamHubError::unauthorized(MSG_INVALID_CREDENTIALS));
    };
    guard.reset(&ctx.ip);

    repos.users.update(|users| {
        let user = users.iter_mut().find(|u| u.id == candidate.id)
            .ok_or_else(|| StreamHubError::unauthorized(MSG_INVALID_CREDENTIALS))?;
        let new_device = ctx.fingerprint.as_ref().is_some_and(|fp| !user.known_fingerprints.contains(fp));
        let country_changed = match (&user.last_country, &ctx.country) {
            (Some(last), Some(current)) => last != current,
            _ => false,
        };
        let score = anomaly_score(new_device && !user.known_fingerprints.is_empty(), country_changed, ctx.vpn);
        if score >= ANOMALY_WARN_THRESHOLD {
            warn!("Suspicious login for {} from {} (score {score:.2})", user.username, ctx.ip);
        }
        if let Some(fp) = ctx.fingerprint.as_ref().filter(|_| new_device) {
            user.known_fingerprints.push(fp.clone());
            if user.known_fingerprints.len() > MAX_KNOWN_FINGERPRINTS {
                user.known_fingerprints.remove(0);
            }
        }
        if ctx.country.is_some() {
            user.last_country.clone_from(&ctx.country);
        }
        user.last_login_at = Some(now);
        user.expire_subscription(now);
        Ok((user.clone(), score))
    }).await
}

pub async fn change_password(repos: &Repositories, user_id: &str, req: &ChangePasswordRequest) -> Result<(), StreamHubError> {
    check_password_policy(&req.new_password)?;
    let password_hash = hash_password(&req.new_password)
        .ok_or_else(|| StreamHubError::new(StreamHubErrorKind::Info, "Failed to hash password".to_string()))?;
    repos.users.update(|users| {
        let user = users.iter_mut().find(|u| u.id == user_id)
            .ok_or_else(|| StreamHubError::not_found(MSG_USER_NOT_FOUND))?;
        if !verify_password(&user.password_hash, req.current_password.as_bytes()) {
            return Err(StreamHubError::unauthorized(MSG_INVALID_CREDENTIALS));
        }
        user.password_hash = password_hash;
        Ok(())
    }).await
}

/// Downgrades users whose subscription ran out.
pub async fn expire_subscriptions(repos: &Repositories, now: DateTime<Utc>) -> Result<usize, StreamHubError> {
    repos.users.update(|users| {
        Ok(users.iter_mut().map(|u| u.expire_subscription(now)).filter(|changed| *changed).count())
    }).await
}
