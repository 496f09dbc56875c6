use chrono::{DateTime, Duration, Utc};
use log::info;

use crate::model::config::Config;
use crate::model::{BadgeKind, CryptoCurrency, Payment, PaymentStatus, PlanConfig};
use crate::repository::Repositories;
use crate::service::chain_service::{fetch_btc_received, fetch_sol_received, is_valid_btc_tx_hash, is_valid_sol_signature};
use crate::service::price_service::{crypto_amount, get_price};
use crate::service::referral_service::award_badge;
use crate::streamhub_error::StreamHubError;
use crate::utils::{MSG_INVALID_SIGNATURE, MSG_INVALID_TX_HASH, MSG_PAYMENT_ALREADY_CONFIRMED, MSG_PAYMENT_EXPIRED, MSG_PAYMENT_NOT_FOUND, MSG_PAYMENT_NOT_PENDING,
                   MSG_PAYMENT_UNAVAILABLE, MSG_TX_ALREADY_USED, MSG_TX_NOT_MATCHING, MSG_UNKNOWN_PLAN, MSG_USER_NOT_FOUND};

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub plan: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
}

impl VerifyPaymentRequest {
    fn transaction_ref(&self) -> Option<&str> {
        self.tx_hash.as_deref().or(self.signature.as_deref()).map(str::trim).filter(|t| !t.is_empty())
    }
}

fn receiving_address(cfg: &Config, currency: CryptoCurrency) -> Option<&str> {
    match currency {
        CryptoCurrency::Btc => cfg.payment.btc_address.as_deref(),
        CryptoCurrency::Sol => cfg.payment.sol_address.as_deref(),
    }
}

fn new_payment(cfg: &Config, user_id: &str, plan: &PlanConfig, currency: CryptoCurrency, address: &str,
               crypto_amount: f64, now: DateTime<Utc>) -> Payment {
    Payment {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        plan: plan.id.clone(),
        plan_days: plan.days,
        fiat_amount: plan.price,
        fiat_currency: cfg.payment.fiat_currency.clone(),
        currency,
        crypto_amount,
        address: address.to_string(),
        tx_hash: None,
        signature: None,
        status: PaymentStatus::Pending,
        created_at: now,
        expires_at: now + Duration::minutes(cfg.payment.payment_ttl_mins),
        confirmed_at: None,
    }
}

/// Stores a pending payment priced at the current exchange rate.
pub async fn create_payment(cfg: &Config, repos: &Repositories, client: &reqwest::Client, user_id: &str,
                            plan_id: &str, currency: CryptoCurrency, now: DateTime<Utc>) -> Result<Payment, StreamHubError> {
    let plan = cfg.payment.get_plan(plan_id).ok_or_else(|| StreamHubError::validation(MSG_UNKNOWN_PLAN))?;
    let address = receiving_address(cfg, currency).ok_or_else(|| StreamHubError::validation(MSG_PAYMENT_UNAVAILABLE))?;
    let quote = get_price(client, &cfg.payment, currency).await;
    let payment = new_payment(cfg, user_id, plan, currency, address, crypto_amount(plan.price, &quote), now);
    repos.payments.update(|payments| {
        payments.push(payment.clone());
        Ok(())
    }).await?;
    info!("Created {} payment {} for plan {}", currency, payment.id, plan.id);
    Ok(payment)
}

fn check_tx_format(currency: CryptoCurrency, tx_ref: &str) -> Result<(), StreamHubError> {
    match currency {
        CryptoCurrency::Btc if !is_valid_btc_tx_hash(tx_ref) => Err(StreamHubError::validation(MSG_INVALID_TX_HASH)),
        CryptoCurrency::Sol if !is_valid_sol_signature(tx_ref) => Err(StreamHubError::validation(MSG_INVALID_SIGNATURE)),
        _ => Ok(()),
    }
}

fn is_tx_used(payments: &[Payment], payment_id: &str, tx_ref: &str) -> bool {
    payments.iter().any(|p| p.id != payment_id && p.transaction_ref().is_some_and(|t| t.eq_ignore_ascii_case(tx_ref)))
}

fn check_verifiable(payments: &mut [Payment], user_id: &str, payment_id: &str, tx_ref: &str, now: DateTime<Utc>) -> Result<Payment, StreamHubError> {
    if is_tx_used(payments, payment_id, tx_ref) {
        return Err(StreamHubError::conflict(MSG_TX_ALREADY_USED));
    }
    let payment = payments.iter_mut().find(|p| p.id == payment_id && p.user_id == user_id)
        .ok_or_else(|| StreamHubError::not_found(MSG_PAYMENT_NOT_FOUND))?;
    match payment.status {
        PaymentStatus::Pending => {}
        PaymentStatus::Confirmed => return Err(StreamHubError::conflict(MSG_PAYMENT_ALREADY_CONFIRMED)),
        PaymentStatus::Expired => return Err(StreamHubError::validation(MSG_PAYMENT_NOT_PENDING)),
    }
    if payment.is_expired(now) {
        payment.status = PaymentStatus::Expired;
        return Err(StreamHubError::validation(MSG_PAYMENT_EXPIRED));
    }
    check_tx_format(payment.currency, tx_ref)?;
    Ok(payment.clone())
}

/// Validates ownership, state and transaction format before any chain lookup.
pub async fn prepare_verification(repos: &Repositories, user_id: &str, payment_id: &str, tx_ref: &str, now: DateTime<Utc>) -> Result<Payment, StreamHubError> {
    let mut payments = repos.payments.load().await;
    let checked = check_verifiable(&mut payments, user_id, payment_id, tx_ref, now);
    if let Err(err) = &checked {
        if err.message == MSG_PAYMENT_EXPIRED {
            expire_payments(repos, now).await?;
        }
    }
    checked
}

/// Confirms the payment once the chain showed `received` smallest units and grants the plan.
pub async fn confirm_payment(repos: &Repositories, user_id: &str, payment_id: &str, tx_ref: &str, received: u64,
                             now: DateTime<Utc>) -> Result<Payment, StreamHubError> {
    let payment = repos.payments.update(|payments| {
        let payment = check_verifiable(payments, user_id, payment_id, tx_ref, now)?;
        if received < payment.currency.to_base_units(payment.crypto_amount) {
            return Err(StreamHubError::validation(MSG_TX_NOT_MATCHING));
        }
        let stored = payments.iter_mut().find(|p| p.id == payment_id)
            .ok_or_else(|| StreamHubError::not_found(MSG_PAYMENT_NOT_FOUND))?;
        match stored.currency {
            CryptoCurrency::Btc => stored.tx_hash = Some(tx_ref.to_lowercase()),
            CryptoCurrency::Sol => stored.signature = Some(tx_ref.to_string()),
        }
        stored.status = PaymentStatus::Confirmed;
        stored.confirmed_at = Some(now);
        Ok(stored.clone())
    }).await?;

    repos.users.update(|users| {
        let user = users.iter_mut().find(|u| u.id == user_id)
            .ok_or_else(|| StreamHubError::not_found(MSG_USER_NOT_FOUND))?;
        user.extend_subscription(now, payment.plan_days);
        Ok(())
    }).await?;
    award_badge(repos, user_id, BadgeKind::Supporter, now).await?;
    info!("Payment {} confirmed, {} days granted", payment.id, payment.plan_days);
    Ok(payment)
}

/// Checks the referenced transaction on chain and confirms the payment.
pub async fn verify_payment(cfg: &Config, repos: &Repositories, client: &reqwest::Client, user_id: &str, payment_id: &str,
                            req: &VerifyPaymentRequest, now: DateTime<Utc>) -> Result<Payment, StreamHubError> {
    let tx_ref = req.transaction_ref().ok_or_else(|| StreamHubError::validation(MSG_INVALID_TX_HASH))?;
    let payment = prepare_verification(repos, user_id, payment_id, tx_ref, now).await?;
    let received = match payment.currency {
        CryptoCurrency::Btc => fetch_btc_received(client, &cfg.payment, tx_ref, &payment.address).await?,
        CryptoCurrency::Sol => fetch_sol_received(client, &cfg.payment, tx_ref, &payment.address).await?,
    };
    confirm_payment(repos, user_id, payment_id, tx_ref, received, now).await
}

/// Flips pending payments past their expiry to expired.
pub async fn expire_payments(repos: &Repositories, now: DateTime<Utc>) -> Result<usize, StreamHubError> {
    let expired = repos.payments.update(|payments| {
        let mut count = 0;
        for payment in payments.iter_mut().filter(|p| p.is_expired(now)) {
            payment.status = PaymentStatus::Expired;
            count += 1;
        }
        Ok(count)
    }).await?;
    if expired > 0 {
        info!("Expired {expired} pending payments");
    }
    Ok(expired)
}

pub async fn list_payments(repos: &Repositories, user_id: &str) -> Vec<Payment> {
    let mut payments = repos.payments.filter(|p| p.user_id == user_id).await;
    payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    payments
}

pub async fn get_payment(repos: &Repositories, user_id: &str, is_admin: bool, payment_id: &str) -> Result<Payment, StreamHubError> {
    repos.payments.find(|p| p.id == payment_id && (is_admin || p.user_id == user_id)).await
        .ok_or_else(|| StreamHubError::not_found(MSG_PAYMENT_NOT_FOUND))
}

#[cfg(test)]
mod tests {
    use super::{confirm_payment, expire_payments, new_payment, prepare_verification};
    use crate::model::user::tests::test_user;
    use crate::model::{BadgeKind, CryptoCurrency, Payment, PaymentStatus};
    use crate::service::tests::{load_user, store_user, test_env, TestEnv};
    use crate::streamhub_error::StreamHubErrorKind;
    use crate::utils::MSG_PAYMENT_ALREADY_CONFIRMED;
    use chrono::{Duration, Utc};

    const SOL_ADDRESS: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

    async fn store_payment(env: &TestEnv, currency: CryptoCurrency, amount: f64, now: chrono::DateTime<Utc>) -> Payment {
        let plan = env.cfg.payment.get_plan("monthly").unwrap();
        let payment = new_payment(&env.cfg, "anna", plan, currency, SOL_ADDRESS, amount, now);
        env.repos.payments.update(|p| { p.push(payment.clone()); Ok(()) }).await.unwrap();
        payment
    }

    #[tokio::test]
    async fn test_confirm_grants_plan() {
        let env = test_env();
        let now = Utc::now();
        store_user(&env, test_user("anna", now)).await;
        let payment = store_payment(&env, CryptoCurrency::Sol, 0.035_642_857, now).await;
        let signature = "5".repeat(88);

        let err = confirm_payment(&env.repos, "anna", &payment.id, &signature, 35_000_000, now).await.unwrap_err();
        assert_eq!(err.kind, StreamHubErrorKind::Validation);

        let confirmed = confirm_payment(&env.repos, "anna", &payment.id, &signature, 35_642_857, now).await.unwrap();
        assert_eq!(confirmed.status, PaymentStatus::Confirmed);
        let user = load_user(&env, "anna").await;
        assert_eq!(user.subscription_end, Some(now + Duration::days(30)));
        assert!(env.repos.badges.load().await.iter().any(|b| b.badge == BadgeKind::Supporter));

        let err = confirm_payment(&env.repos, "anna", &payment.id, &signature, 35_642_857, now).await.unwrap_err();
        assert_eq!(err.kind, StreamHubErrorKind::Conflict);
        assert_eq!(err.message, MSG_PAYMENT_ALREADY_CONFIRMED);
        assert_eq!(load_user(&env, "anna").await.subscription_end, Some(now + Duration::days(30)));
    }

    #[tokio::test]
    async fn test_tx_reuse_rejected() {
        let env = test_env();
        let now = Utc::now();
        store_user(&env, test_user("anna", now)).await;
        let first = store_payment(&env, CryptoCurrency::Btc, 0.000_083_17, now).await;
        let second = store_payment(&env, CryptoCurrency::Btc, 0.000_083_17, now).await;
        let tx_hash = "ab".repeat(32);
        confirm_payment(&env.repos, "anna", &first.id, &tx_hash, 8317, now).await.unwrap();
        let err = prepare_verification(&env.repos, "anna", &second.id, &tx_hash.to_uppercase(), now).await.unwrap_err();
        assert_eq!(err.kind, StreamHubErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_verification_rules() {
        let env = test_env();
        let now = Utc::now();
        let payment = store_payment(&env, CryptoCurrency::Btc, 0.000_083_17, now).await;
        let tx_hash = "ab".repeat(32);
        let err = prepare_verification(&env.repos, "bob", &payment.id, &tx_hash, now).await.unwrap_err();
        assert_eq!(err.kind, StreamHubErrorKind::NotFound);
        let err = prepare_verification(&env.repos, "anna", &payment.id, "xyz", now).await.unwrap_err();
        assert_eq!(err.kind, StreamHubErrorKind::Validation);
        assert!(prepare_verification(&env.repos, "anna", &payment.id, &tx_hash, now).await.is_ok());

        let later = now + Duration::minutes(31);
        let err = prepare_verification(&env.repos, "anna", &payment.id, &tx_hash, later).await.unwrap_err();
        assert_eq!(err.message, "Paiement expiré");
        let stored = env.repos.payments.find(|p| p.id == payment.id).await.unwrap();
        assert_eq!(stored.status, PaymentStatus::Expired);
    }

    #[tokio::test]
    async fn test_expiry_sweep() {
        let env = test_env();
        let now = Utc::now();
        store_payment(&env, CryptoCurrency::Sol, 0.1, now - Duration::minutes(45)).await;
        store_payment(&env, CryptoCurrency::Sol, 0.1, now).await;
        assert_eq!(expire_payments(&env.repos, now).await.unwrap(), 1);
        assert_eq!(expire_payments(&env.repos, now).await.unwrap(), 0);
    }
}
