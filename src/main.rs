mod streamhub_error;
mod utils;
mod model;
mod messaging;
mod tools;
mod repository;
mod auth;
mod service;
mod api;

use std::sync::Arc;

use clap::Parser;
use env_logger::{Builder, Target};
use log::{error, info, LevelFilter};

use crate::model::config::Config;
use crate::utils::file::config_reader;
use crate::utils::file::file_utils;

#[derive(Parser)]
#[command(version, about = "Streaming platform backend with crypto payments", long_about = None)]
struct Args {
    /// The config file
    #[arg(short = 'c', long = "config")]
    config_file: Option<String>,

    /// Overrides the data directory of the config
    #[arg(short = 'd', long = "data-dir")]
    data_dir: Option<String>,

    /// Log level: error, warn, info, debug, trace
    #[arg(short = 'l', long = "log-level")]
    log_level: Option<String>,

    /// Probes the health endpoint of a running server and exits
    #[arg(long)]
    healthcheck: bool,
}

fn main() {
    let args = Args::parse();

    let config_file = args.config_file.clone().unwrap_or_else(file_utils::get_default_config_file_path);
    let mut cfg = read_config(&config_file, &args);
    init_logger(args.log_level.as_deref(), &cfg);

    if args.healthcheck {
        healthcheck(&cfg);
    }

    if let Err(err) = cfg.prepare(&config_file) {
        exit!("{}", err);
    }

    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    if let Some(build_ts) = option_env!("VERGEN_BUILD_TIMESTAMP") {
        info!("Build time: {build_ts}");
    }
    info!("Config file: {config_file}");
    info!("Data dir: {}", cfg.t_data_path.display());
    info!("Web root: {}", cfg.api.web_root);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => exit!("Can't start runtime: {}", err),
    };
    if let Err(err) = runtime.block_on(api::main_api::start_server(Arc::new(cfg))) {
        exit!("Can't start server: {}", err);
    }
}

fn read_config(config_file: &str, args: &Args) -> Config {
    match config_reader::read_config(config_file) {
        Ok(mut cfg) => {
            if let Some(data_dir) = &args.data_dir {
                cfg.data_dir.clone_from(data_dir);
            }
            cfg
        }
        Err(err) => {
            // logger is not initialized yet
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}

fn get_log_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    }
}

fn init_logger(arg_level: Option<&str>, cfg: &Config) {
    let mut log_builder = Builder::from_default_env();
    log_builder.target(Target::Stdout);

    // priority: cli argument, RUST_LOG, config, info
    let env_level = std::env::var("RUST_LOG").ok();
    let config_level = cfg.log.as_ref().and_then(|l| l.log_level.clone());
    match arg_level.map(String::from).or(env_level).or(config_level) {
        Some(level) if level.contains('=') => {
            log_builder.parse_filters(&level);
        }
        Some(level) => {
            log_builder.filter_level(get_log_level(&level));
        }
        None => {
            log_builder.filter_level(LevelFilter::Info);
        }
    }
    for noisy in ["hyper", "hyper_util", "reqwest", "tower_http", "rustls"] {
        log_builder.filter_module(noisy, LevelFilter::Warn);
    }
    log_builder.init();
}

fn healthcheck(cfg: &Config) -> ! {
    let host = if cfg.api.host == "0.0.0.0" { "127.0.0.1" } else { cfg.api.host.as_str() };
    let url = format!("http://{host}:{}/api/health", cfg.api.port);
    let result = tokio::runtime::Builder::new_current_thread().enable_all().build()
        .map_err(|err| err.to_string())
        .and_then(|runtime| runtime.block_on(async {
            let response = reqwest::get(&url).await.map_err(|err| err.to_string())?;
            let status = response.status();
            let body: serde_json::Value = response.json().await.map_err(|err| err.to_string())?;
            if status.is_success() && body.get("status").and_then(serde_json::Value::as_str) == Some("ok") {
                Ok(())
            } else {
                Err(format!("unhealthy response {status}"))
            }
        }));
    match result {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            error!("Healthcheck failed: {err}");
            std::process::exit(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{get_log_level, Args};
    use clap::Parser;
    use log::LevelFilter;

    #[test]
    fn test_args() {
        let args = Args::parse_from(["streamhub", "-c", "/etc/streamhub/config.yml", "--data-dir", "/var/lib/streamhub", "--healthcheck"]);
        assert_eq!(args.config_file.as_deref(), Some("/etc/streamhub/config.yml"));
        assert_eq!(args.data_dir.as_deref(), Some("/var/lib/streamhub"));
        assert!(args.healthcheck);
        assert!(args.log_level.is_none());
    }

    #[test]
    fn test_log_level() {
        assert_eq!(get_log_level("DEBUG"), LevelFilter::Debug);
        assert_eq!(get_log_level("unknown"), LevelFilter::Info);
    }
}
