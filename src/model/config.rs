use std::path::PathBuf;
use std::str::FromStr;

use cron::Schedule;
use log::warn;

use crate::model::{AdsConfig, LogConfig, MessagingConfig, PaymentConfig, RecordingConfig, SecurityConfig, WebAuthConfig};
use crate::streamhub_error::{create_streamhub_error_result, StreamHubError, StreamHubErrorKind};
use crate::utils::file::file_utils;
use crate::utils::network::request::set_sanitize_sensitive_info;
use crate::utils::{default_access_token_ttl_secs, default_analytics_max_events, default_api_host, default_api_port,
                   default_data_dir, default_maintenance_schedule, default_referral_reward_days, default_terms_version,
                   generate_secret};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigApi {
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
    #[serde(default)]
    pub web_root: String,
    /// allowed cors origins, empty allows any
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ConfigApi {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
            web_root: String::new(),
            cors_origins: vec![],
        }
    }
}

impl ConfigApi {
    pub fn prepare(&mut self) {
        if self.web_root.is_empty() {
            self.web_root = String::from("./web");
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleConfig {
    #[serde(default = "default_maintenance_schedule")]
    pub schedule: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferralConfig {
    #[serde(default = "default_referral_reward_days")]
    pub reward_days: i64,
}

impl Default for ReferralConfig {
    fn default() -> Self {
        Self { reward_days: default_referral_reward_days() }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyticsConfig {
    #[serde(default = "default_analytics_max_events")]
    pub max_events: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self { max_events: default_analytics_max_events() }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TermsConfig {
    #[serde(default = "default_terms_version")]
    pub version: String,
}

impl Default for TermsConfig {
    fn default() -> Self {
        Self { version: default_terms_version() }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub api: ConfigApi,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    pub web_auth: WebAuthConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<LogConfig>,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub ads: AdsConfig,
    #[serde(default)]
    pub payment: PaymentConfig,
    #[serde(default)]
    pub referral: ReferralConfig,
    #[serde(default)]
    pub recording: RecordingConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub terms: TermsConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messaging: Option<MessagingConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedules: Option<Vec<ScheduleConfig>>,
    #[serde(default = "default_access_token_ttl_secs")]
    pub access_token_ttl_secs: u16,
    #[serde(skip)]
    pub t_access_token_secret: [u8; 32],
    #[serde(skip)]
    pub t_data_path: PathBuf,
    #[serde(skip)]
    pub t_recording_path: PathBuf,
    #[serde(skip)]
    pub t_config_path: String,
}

impl Config {
    /// Validates the config, creates the data directories and generates the computed secrets.
    pub fn prepare(&mut self, config_path: &str) -> Result<(), StreamHubError> {
        self.t_config_path = config_path.to_string();
        self.t_access_token_secret = generate_secret();
        set_sanitize_sensitive_info(self.log.as_ref().is_none_or(|l| l.sanitize_sensitive_info));
        self.api.prepare();
        self.web_auth.prepare()?;
        self.payment.prepare()?;
        self.prepare_directories()?;
        self.check_schedules()?;
        if self.ads.hourly_cap == 0 || self.ads.daily_cap == 0 || self.ads.session_cap == 0 {
            warn!("An ad frequency cap of 0 blocks every ad");
        }
        if self.referral.reward_days <= 0 {
            return create_streamhub_error_result!(StreamHubErrorKind::Info, "referral.reward_days must be positive");
        }
        Ok(())
    }

    fn prepare_directories(&mut self) -> Result<(), StreamHubError> {
        let base = if self.t_config_path.is_empty() { String::new() } else {
            PathBuf::from(&self.t_config_path).parent().map(|p| p.to_string_lossy().to_string()).unwrap_or_default()
        };
        self.t_data_path = file_utils::prepare_directory(&base, &self.data_dir)
            .map_err(|err| StreamHubError::new(StreamHubErrorKind::Info, format!("cant create data dir {}: {err}", self.data_dir)))?;
        let data_dir = self.t_data_path.to_string_lossy().to_string();
        self.t_recording_path = file_utils::prepare_directory(&data_dir, &self.recording.output_dir)
            .map_err(|err| StreamHubError::new(StreamHubErrorKind::Info, format!("cant create recording dir {}: {err}", self.recording.output_dir)))?;
        Ok(())
    }

    fn check_schedules(&self) -> Result<(), StreamHubError> {
        if let Some(schedules) = &self.schedules {
            for schedule in schedules {
                if let Err(err) = Schedule::from_str(&schedule.schedule) {
                    return create_streamhub_error_result!(StreamHubErrorKind::Info, "invalid schedule {}: {}", schedule.schedule, err);
                }
            }
        }
        Ok(())
    }

    pub fn maintenance_schedules(&self) -> Vec<String> {
        match &self.schedules {
            Some(schedules) if !schedules.is_empty() => schedules.iter().map(|s| s.schedule.clone()).collect(),
            _ => vec![default_maintenance_schedule()],
        }
    }

    pub fn data_file(&self, file_name: &str) -> PathBuf {
        self.t_data_path.join(file_name)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::model::config::Config;
    use crate::utils::file::config_reader::parse_config;

    pub(crate) fn test_config(data_dir: &std::path::Path) -> Config {
        let yaml = format!("data_dir: {}\nweb_auth:\n  issuer: streamhub\n  secret: 0123456789abcdef0123\n  admin_users: [root]\n", data_dir.display());
        let mut cfg = parse_config(&yaml).unwrap();
        cfg.prepare("").unwrap();
        cfg
    }

    #[test]
    fn test_prepare_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_config(&dir.path().join("data"));
        assert!(cfg.t_data_path.is_dir());
        assert!(cfg.t_recording_path.is_dir());
        assert!(cfg.t_recording_path.starts_with(&cfg.t_data_path));
        assert_eq!(cfg.maintenance_schedules().len(), 1);
        assert!(cfg.web_auth.is_admin_user("ROOT"));
    }

    #[test]
    fn test_invalid_schedule() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = format!("data_dir: {}\nweb_auth:\n  issuer: a\n  secret: 0123456789abcdef0123\nschedules:\n  - schedule: 'every minute'\n", dir.path().display());
        let mut cfg = parse_config(&yaml).unwrap();
        assert!(cfg.prepare("").is_err());
    }

    #[test]
    fn test_short_secret() {
        let yaml = "web_auth:\n  issuer: a\n  secret: short\n";
        let mut cfg = parse_config(yaml).unwrap();
        assert!(cfg.prepare("").is_err());
    }
}
