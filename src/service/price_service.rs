use std::collections::HashMap;

use log::{debug, warn};

use crate::model::{CryptoCurrency, PaymentConfig};
use crate::utils::network::request::get_json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Coinbase,
    Coingecko,
    Fallback,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub currency: CryptoCurrency,
    pub fiat_currency: String,
    /// fiat per coin
    pub price: f64,
    pub source: PriceSource,
}

#[derive(Debug, serde::Deserialize)]
struct CoinbaseRates {
    data: CoinbaseRatesData,
}

#[derive(Debug, serde::Deserialize)]
struct CoinbaseRatesData {
    rates: HashMap<String, String>,
}

fn parse_coinbase(rates: &CoinbaseRates, fiat: &str) -> Option<f64> {
    rates.data.rates.get(fiat)
        .and_then(|rate| rate.parse::<f64>().ok())
        .filter(|price| price.is_finite() && *price > 0.0)
}

fn parse_coingecko(prices: &HashMap<String, HashMap<String, f64>>, currency: CryptoCurrency, fiat: &str) -> Option<f64> {
    prices.get(currency.coingecko_id())
        .and_then(|p| p.get(&fiat.to_lowercase()))
        .copied()
        .filter(|price| price.is_finite() && *price > 0.0)
}

async fn coinbase_price(client: &reqwest::Client, cfg: &PaymentConfig, currency: CryptoCurrency) -> Option<f64> {
    let url = format!("{}?currency={}", cfg.coinbase_url, currency.symbol());
    match get_json::<CoinbaseRates>(client, &url).await {
        Ok(rates) => parse_coinbase(&rates, &cfg.fiat_currency),
        Err(err) => {
            debug!("Coinbase price lookup failed: {err}");
            None
        }
    }
}

async fn coingecko_price(client: &reqwest::Client, cfg: &PaymentConfig, currency: CryptoCurrency) -> Option<f64> {
    let url = format!("{}?ids={}&vs_currencies={}", cfg.coingecko_url, currency.coingecko_id(), cfg.fiat_currency.to_lowercase());
    match get_json::<HashMap<String, HashMap<String, f64>>>(client, &url).await {
        Ok(prices) => parse_coingecko(&prices, currency, &cfg.fiat_currency),
        Err(err) => {
            debug!("CoinGecko price lookup failed: {err}");
            None
        }
    }
}

fn fallback_price(cfg: &PaymentConfig, currency: CryptoCurrency) -> f64 {
    match currency {
        CryptoCurrency::Btc => cfg.btc_fallback_price,
        CryptoCurrency::Sol => cfg.sol_fallback_price,
    }
}

/// Coinbase first, then CoinGecko, then the configured constant.
pub async fn get_price(client: &reqwest::Client, cfg: &PaymentConfig, currency: CryptoCurrency) -> PriceQuote {
    let (price, source) = if let Some(price) = coinbase_price(client, cfg, currency).await {
        (price, PriceSource::Coinbase)
    } else if let Some(price) = coingecko_price(client, cfg, currency).await {
        (price, PriceSource::Coingecko)
    } else {
        warn!("Using fallback {currency} price");
        (fallback_price(cfg, currency), PriceSource::Fallback)
    };
    PriceQuote { currency, fiat_currency: cfg.fiat_currency.clone(), price, source }
}

/// Coin amount for a fiat price, rounded to the smallest unit.
pub fn crypto_amount(fiat_amount: f64, quote: &PriceQuote) -> f64 {
    quote.currency.round_amount(fiat_amount / quote.price)
}
