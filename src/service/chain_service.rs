//! On-chain lookups used to confirm crypto payments.

use log::debug;
use serde_json::{json, Value};

use crate::model::{is_base58, PaymentConfig};
use crate::streamhub_error::StreamHubError;
use crate::utils::network::request::{get_json, post_json};

#[derive(Debug, Clone, serde::Deserialize)]
pub struct EsploraOutput {
    #[serde(default)]
    pub scriptpubkey_address: Option<String>,
    #[serde(default)]
    pub value: u64,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct EsploraTx {
    pub txid: String,
    #[serde(default)]
    pub vout: Vec<EsploraOutput>,
}

pub fn is_valid_btc_tx_hash(tx_hash: &str) -> bool {
    tx_hash.len() == 64 && tx_hash.chars().all(|c| c.is_ascii_hexdigit())
}

pub fn is_valid_sol_signature(signature: &str) -> bool {
    (64..=88).contains(&signature.len()) && is_base58(signature)
}

/// Sum of the outputs paying `address`.
pub fn btc_received(tx: &EsploraTx, address: &str) -> u64 {
    tx.vout.iter()
        .filter(|o| o.scriptpubkey_address.as_deref() == Some(address))
        .map(|o| o.value)
        .sum()
}

fn account_key(entry: &Value) -> Option<&str> {
    // jsonParsed returns objects, plain encodings return strings
    entry.get("pubkey").and_then(Value::as_str).or_else(|| entry.as_str())
}

/// Lamports `address` gained in a successful `getTransaction` result.
pub fn sol_received(result: &Value, address: &str) -> u64 {
    let meta = &result["meta"];
    if meta.is_null() || !meta["err"].is_null() {
        return 0;
    }
    let Some(keys) = result["transaction"]["message"]["accountKeys"].as_array() else {
        return 0;
    };
    let Some(index) = keys.iter().position(|k| account_key(k) == Some(address)) else {
        return 0;
    };
    let pre = meta["preBalances"][index].as_u64().unwrap_or(0);
    let post = meta["postBalances"][index].as_u64().unwrap_or(0);
    post.saturating_sub(pre)
}

pub async fn fetch_btc_received(client: &reqwest::Client, cfg: &PaymentConfig, tx_hash: &str, address: &str) -> Result<u64, StreamHubError> {
    let url = format!("{}/tx/{tx_hash}", cfg.esplora_url.trim_end_matches('/'));
    let tx = get_json::<EsploraTx>(client, &url).await?;
    let received = btc_received(&tx, address);
    debug!("Bitcoin tx pays {received} sats to the receiving address");
    Ok(received)
}

pub async fn fetch_sol_received(client: &reqwest::Client, cfg: &PaymentConfig, signature: &str, address: &str) -> Result<u64, StreamHubError> {
    let body = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "getTransaction",
        "params": [signature, {"encoding": "jsonParsed", "commitment": "confirmed", "maxSupportedTransactionVersion": 0}]
    });
    let response = post_json::<Value>(client, &cfg.solana_rpc_url, &body).await?;
    let received = sol_received(&response["result"], address);
    debug!("Solana tx pays {received} lamports to the receiving address");
    Ok(received)
}

#[cfg(test)]
mod tests {
    use super::{btc_received, is_valid_btc_tx_hash, is_valid_sol_signature, sol_received, EsploraTx};
    use serde_json::json;

    const BTC_ADDRESS: &str = "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq";
    const SOL_ADDRESS: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

    #[test]
    fn test_formats() {
        assert!(is_valid_btc_tx_hash(&"a1".repeat(32)));
        assert!(!is_valid_btc_tx_hash(&"g1".repeat(32)));
        assert!(!is_valid_btc_tx_hash("abc"));
        assert!(is_valid_sol_signature(&"5".repeat(87)));
        assert!(!is_valid_sol_signature(&"0".repeat(87)));
        assert!(!is_valid_sol_signature("5abc"));
    }

    #[test]
    fn test_btc_outputs() {
        let tx: EsploraTx = serde_json::from_value(json!({
            "txid": "ab",
            "vout": [
                {"scriptpubkey_address": BTC_ADDRESS, "value": 5000},
                {"scriptpubkey_address": "bc1qother", "value": 90000},
                {"scriptpubkey_address": BTC_ADDRESS, "value": 3317},
                {"value": 0}
            ]
        })).unwrap();
        assert_eq!(btc_received(&tx, BTC_ADDRESS), 8317);
    }

    #[test]
    fn test_sol_balance_delta() {
        let result = json!({
            "meta": {"err": null, "preBalances": [1_000_000_000u64, 5_000], "postBalances": [964_000_000u64, 35_647_857]},
            "transaction": {"message": {"accountKeys": [
                {"pubkey": "Payer111111111111111111111111111111111111111", "signer": true},
                {"pubkey": SOL_ADDRESS, "signer": false}
            ]}}
        });
        assert_eq!(sol_received(&result, SOL_ADDRESS), 35_642_857);

        let mut failed = result.clone();
        failed["meta"]["err"] = json!({"InstructionError": [0, "Custom"]});
        assert_eq!(sol_received(&failed, SOL_ADDRESS), 0);
        assert_eq!(sol_received(&json!(null), SOL_ADDRESS), 0);
    }
}
