pub(crate) fn default_as_true() -> bool { true }

pub(crate) fn default_as_false() -> bool { false }

pub(crate) fn default_as_empty_list<T>() -> Vec<T> { vec![] }

pub(crate) fn default_api_host() -> String { String::from("0.0.0.0") }

pub(crate) fn default_api_port() -> u16 { 8901 }

pub(crate) fn default_data_dir() -> String { String::from("data") }

pub(crate) fn default_token_ttl_mins() -> u32 { 30 }

pub(crate) fn default_access_token_ttl_secs() -> u16 { 300 }

pub(crate) fn default_rate_limit_window_secs() -> u64 { 60 }

pub(crate) fn default_rate_limit_max_requests() -> u32 { 300 }

pub(crate) fn default_login_max_attempts() -> u32 { 5 }

pub(crate) fn default_login_window_mins() -> i64 { 15 }

pub(crate) fn default_geo_url() -> String { String::from("http://ip-api.com/json") }

pub(crate) fn default_ads_hourly_cap() -> u32 { 10 }

pub(crate) fn default_ads_daily_cap() -> u32 { 40 }

pub(crate) fn default_ads_session_cap() -> u32 { 15 }

pub(crate) fn default_ad_token_ttl_secs() -> i64 { 300 }

pub(crate) fn default_ad_token_sweep_secs() -> u64 { 60 }

pub(crate) fn default_adblock_threshold() -> f64 { 0.5 }

pub(crate) fn default_ad_log_size() -> usize { 10_000 }

pub(crate) fn default_fiat_currency() -> String { String::from("EUR") }

pub(crate) fn default_payment_ttl_mins() -> i64 { 30 }

pub(crate) fn default_esplora_url() -> String { String::from("https://blockstream.info/api") }

pub(crate) fn default_solana_rpc_url() -> String { String::from("https://api.mainnet-beta.solana.com") }

pub(crate) fn default_coinbase_url() -> String { String::from("https://api.coinbase.com/v2/exchange-rates") }

pub(crate) fn default_coingecko_url() -> String { String::from("https://api.coingecko.com/api/v3/simple/price") }

pub(crate) fn default_btc_fallback_price() -> f64 { 60_000.0 }

pub(crate) fn default_sol_fallback_price() -> f64 { 140.0 }

pub(crate) fn default_referral_reward_days() -> i64 { 7 }

pub(crate) fn default_ffmpeg_path() -> String { String::from("ffmpeg") }

pub(crate) fn default_recording_max_duration_mins() -> i64 { 240 }

pub(crate) fn default_recording_max_concurrent() -> usize { 2 }

pub(crate) fn default_recording_tick_secs() -> u64 { 30 }

pub(crate) fn default_analytics_max_events() -> usize { 50_000 }

pub(crate) fn default_terms_version() -> String { String::from("1.0") }

pub(crate) fn default_maintenance_schedule() -> String { String::from("0 * * * * * *") }
