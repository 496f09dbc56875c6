use std::collections::HashSet;

use crate::streamhub_error::{create_streamhub_error_result, StreamHubError, StreamHubErrorKind};
use crate::utils::{default_btc_fallback_price, default_coinbase_url, default_coingecko_url, default_esplora_url,
                   default_fiat_currency, default_payment_ttl_mins, default_sol_fallback_price, default_solana_rpc_url};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanConfig {
    pub id: String,
    pub name: String,
    pub days: i64,
    /// price in the configured fiat currency
    pub price: f64,
}

fn default_plans() -> Vec<PlanConfig> {
    vec![
        PlanConfig { id: "monthly".to_string(), name: "Mensuel".to_string(), days: 30, price: 4.99 },
        PlanConfig { id: "quarterly".to_string(), name: "Trimestriel".to_string(), days: 90, price: 12.99 },
        PlanConfig { id: "yearly".to_string(), name: "Annuel".to_string(), days: 365, price: 44.99 },
    ]
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentConfig {
    #[serde(default = "default_fiat_currency")]
    pub fiat_currency: String,
    #[serde(default = "default_plans")]
    pub plans: Vec<PlanConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub btc_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sol_address: Option<String>,
    #[serde(default = "default_esplora_url")]
    pub esplora_url: String,
    #[serde(default = "default_solana_rpc_url")]
    pub solana_rpc_url: String,
    #[serde(default = "default_coinbase_url")]
    pub coinbase_url: String,
    #[serde(default = "default_coingecko_url")]
    pub coingecko_url: String,
    #[serde(default = "default_btc_fallback_price")]
    pub btc_fallback_price: f64,
    #[serde(default = "default_sol_fallback_price")]
    pub sol_fallback_price: f64,
    #[serde(default = "default_payment_ttl_mins")]
    pub payment_ttl_mins: i64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            fiat_currency: default_fiat_currency(),
            plans: default_plans(),
            btc_address: None,
            sol_address: None,
            esplora_url: default_esplora_url(),
            solana_rpc_url: default_solana_rpc_url(),
            coinbase_url: default_coinbase_url(),
            coingecko_url: default_coingecko_url(),
            btc_fallback_price: default_btc_fallback_price(),
            sol_fallback_price: default_sol_fallback_price(),
            payment_ttl_mins: default_payment_ttl_mins(),
        }
    }
}

pub fn is_base58(text: &str) -> bool {
    text.chars().all(|c| c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l'))
}

pub fn is_valid_btc_address(address: &str) -> bool {
    let lower = address.to_lowercase();
    if lower.starts_with("bc1") || lower.starts_with("tb1") {
        return (14..=74).contains(&address.len()) && lower.chars().all(|c| c.is_ascii_alphanumeric());
    }
    (address.starts_with('1') || address.starts_with('3')) && (26..=35).contains(&address.len()) && is_base58(address)
}

pub fn is_valid_sol_address(address: &str) -> bool {
    (32..=44).contains(&address.len()) && is_base58(address)
}

impl PaymentConfig {
    pub fn prepare(&mut self) -> Result<(), StreamHubError> {
        self.fiat_currency = self.fiat_currency.trim().to_uppercase();
        let mut plan_ids = HashSet::new();
        for plan in &mut self.plans {
            plan.id = plan.id.trim().to_lowercase();
            if plan.id.is_empty() || plan.days <= 0 || plan.price <= 0.0 {
                return create_streamhub_error_result!(StreamHubErrorKind::Info, "invalid payment plan {}", plan.id);
            }
            if !plan_ids.insert(plan.id.clone()) {
                return create_streamhub_error_result!(StreamHubErrorKind::Info, "payment plan ids should be unique: {}", plan.id);
            }
        }
        if let Some(address) = self.btc_address.as_ref() {
            if !is_valid_btc_address(address) {
                return create_streamhub_error_result!(StreamHubErrorKind::Info, "invalid bitcoin address {}", address);
            }
        }
        if let Some(address) = self.sol_address.as_ref() {
            if !is_valid_sol_address(address) {
                return create_streamhub_error_result!(StreamHubErrorKind::Info, "invalid solana address {}", address);
            }
        }
        if self.btc_fallback_price <= 0.0 || self.sol_fallback_price <= 0.0 {
            return create_streamhub_error_result!(StreamHubErrorKind::Info, "fallback prices must be positive");
        }
        if self.payment_ttl_mins <= 0 {
            self.payment_ttl_mins = default_payment_ttl_mins();
        }
        Ok(())
    }

    pub fn get_plan(&self, plan_id: &str) -> Option<&PlanConfig> {
        self.plans.iter().find(|p| p.id.eq_ignore_ascii_case(plan_id))
    }
}

#[cfg(test)]
mod tests {
    use super::{is_valid_btc_address, is_valid_sol_address, PaymentConfig};

    #[test]
    fn test_addresses() {
        assert!(is_valid_btc_address("bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq"));
        assert!(is_valid_btc_address("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2"));
        assert!(!is_valid_btc_address("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN0"));
        assert!(is_valid_sol_address("9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM"));
        assert!(!is_valid_sol_address("short"));
    }

    #[test]
    fn test_prepare_plans() {
        let mut cfg = PaymentConfig::default();
        assert!(cfg.prepare().is_ok());
        assert_eq!(cfg.get_plan("Monthly").map(|p| p.days), Some(30));
        cfg.plans.push(cfg.plans[0].clone());
        assert!(cfg.prepare().is_err());
    }
}
