use chrono::{DateTime, Utc};
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CryptoCurrency {
    Btc,
    Sol,
}

impl CryptoCurrency {
    /// Decimal places of the smallest unit (satoshi, lamport).
    pub const fn decimals(self) -> i32 {
        match self {
            Self::Btc => 8,
            Self::Sol => 9,
        }
    }

    pub const fn coingecko_id(self) -> &'static str {
        match self {
            Self::Btc => "bitcoin",
            Self::Sol => "solana",
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Btc => "BTC",
            Self::Sol => "SOL",
        }
    }

    /// Rounds a coin amount to the smallest unit.
    pub fn round_amount(self, amount: f64) -> f64 {
        let factor = 10f64.powi(self.decimals());
        (amount * factor).round() / factor
    }

    /// Converts a coin amount into smallest units.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_base_units(self, amount: f64) -> u64 {
        (amount * 10f64.powi(self.decimals())).round().max(0.0) as u64
    }
}

impl Display for CryptoCurrency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Confirmed,
    Expired,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub user_id: String,
    pub plan: String,
    pub plan_days: i64,
    pub fiat_amount: f64,
    pub fiat_currency: String,
    pub currency: CryptoCurrency,
    pub crypto_amount: f64,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl Payment {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == PaymentStatus::Pending && self.expires_at <= now
    }

    /// Transaction reference, hash for bitcoin, signature for solana.
    pub fn transaction_ref(&self) -> Option<&str> {
        match self.currency {
            CryptoCurrency::Btc => self.tx_hash.as_deref(),
            CryptoCurrency::Sol => self.signature.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CryptoCurrency;

    #[test]
    fn test_amounts() {
        assert_eq!(CryptoCurrency::Btc.round_amount(0.000_083_166_666), 0.000_083_17);
        assert_eq!(CryptoCurrency::Btc.to_base_units(0.000_083_17), 8317);
        assert_eq!(CryptoCurrency::Sol.to_base_units(0.035_642_857), 35_642_857);
    }
}
