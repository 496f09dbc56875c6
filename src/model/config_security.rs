use crate::utils::{default_as_false, default_geo_url, default_login_max_attempts, default_login_window_mins,
                   default_rate_limit_max_requests, default_rate_limit_window_secs};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecurityConfig {
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,
    /// requests per window and client ip, 0 disables the limit
    #[serde(default = "default_rate_limit_max_requests")]
    pub rate_limit_max_requests: u32,
    #[serde(default = "default_login_max_attempts")]
    pub login_max_attempts: u32,
    #[serde(default = "default_login_window_mins")]
    pub login_window_mins: i64,
    /// use `x-forwarded-for` / `x-real-ip` for the client ip
    #[serde(default = "default_as_false")]
    pub trust_proxy_headers: bool,
    #[serde(default = "default_as_false")]
    pub geo_lookup: bool,
    #[serde(default = "default_geo_url")]
    pub geo_url: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            rate_limit_window_secs: default_rate_limit_window_secs(),
            rate_limit_max_requests: default_rate_limit_max_requests(),
            login_max_attempts: default_login_max_attempts(),
            login_window_mins: default_login_window_mins(),
            trust_proxy_headers: false,
            geo_lookup: false,
            geo_url: default_geo_url(),
        }
    }
}
