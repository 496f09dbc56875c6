use std::env;
use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use crate::model::config::Config;
use crate::streamhub_error::{create_streamhub_error_result, StreamHubError, StreamHubErrorKind};

static ENV_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| Regex::new(r"\$\{env:(?P<var>[a-zA-Z_][a-zA-Z0-9_]*)}").unwrap());

pub fn resolve_env_var(value: &str) -> String {
    ENV_REGEX.replace_all(value, |caps: &regex::Captures| {
        let var_name = &caps["var"];
        env::var(var_name).unwrap_or_else(|_| format!("${{env:{var_name}}}"))
    }).to_string()
}

pub fn parse_config(content: &str) -> Result<Config, StreamHubError> {
    match serde_yaml::from_str::<Config>(&resolve_env_var(content)) {
        Ok(cfg) => Ok(cfg),
        Err(err) => create_streamhub_error_result!(StreamHubErrorKind::Info, "cant read config file: {}", err)
    }
}

pub fn read_config(config_file: &str) -> Result<Config, StreamHubError> {
    debug!("Reading config {config_file}");
    match std::fs::read_to_string(config_file) {
        Ok(content) => parse_config(&content),
        Err(err) => create_streamhub_error_result!(StreamHubErrorKind::Info, "cant open config file {}: {}", config_file, err)
    }
}
