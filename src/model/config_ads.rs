use crate::utils::{default_ad_log_size, default_ad_token_sweep_secs, default_ad_token_ttl_secs, default_adblock_threshold,
                   default_ads_daily_cap, default_ads_hourly_cap, default_ads_session_cap};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdsConfig {
    #[serde(default = "default_ads_hourly_cap")]
    pub hourly_cap: u32,
    #[serde(default = "default_ads_daily_cap")]
    pub daily_cap: u32,
    #[serde(default = "default_ads_session_cap")]
    pub session_cap: u32,
    #[serde(default = "default_ad_token_ttl_secs")]
    pub token_ttl_secs: i64,
    #[serde(default = "default_ad_token_sweep_secs")]
    pub token_sweep_secs: u64,
    #[serde(default = "default_adblock_threshold")]
    pub detection_threshold: f64,
    /// entries kept in the impression and detection logs
    #[serde(default = "default_ad_log_size")]
    pub log_size: usize,
}

impl Default for AdsConfig {
    fn default() -> Self {
        Self {
            hourly_cap: default_ads_hourly_cap(),
            daily_cap: default_ads_daily_cap(),
            session_cap: default_ads_session_cap(),
            token_ttl_secs: default_ad_token_ttl_secs(),
            token_sweep_secs: default_ad_token_sweep_secs(),
            detection_threshold: default_adblock_threshold(),
            log_size: default_ad_log_size(),
        }
    }
}
