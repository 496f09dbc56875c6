use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use chrono::{DateTime, FixedOffset, Local, Utc};
use cron::Schedule;
use log::{error, info};

use crate::api::model::app_state::AppState;
use crate::exit;
use crate::service::{adblock_service, payment_service, user_service};
use crate::utils::{debug_if_enabled, KV_SNAPSHOT_FILE};

fn datetime_to_instant(datetime: DateTime<FixedOffset>) -> Instant {
    let target_system_time: SystemTime = datetime.into();
    let duration_until = target_system_time
        .duration_since(SystemTime::now())
        .unwrap_or_else(|_| Duration::from_secs(0));
    Instant::now() + duration_until
}

/// Expires pending payments and lapsed subscriptions, then persists the key value store.
pub async fn run_maintenance(app_state: &AppState) {
    let now = Utc::now();
    if let Err(err) = payment_service::expire_payments(&app_state.repos, now).await {
        error!("Failed to expire payments: {err}");
    }
    match user_service::expire_subscriptions(&app_state.repos, now).await {
        Ok(0) => {}
        Ok(count) => info!("Expired {count} premium subscriptions"),
        Err(err) => error!("Failed to expire subscriptions: {err}"),
    }
    let snapshot = app_state.config.data_file(KV_SNAPSHOT_FILE);
    if let Err(err) = app_state.kv.snapshot(&snapshot) {
        error!("Failed to write kv snapshot {}: {err}", snapshot.display());
    }
}

pub async fn start_scheduler(expression: &str, app_state: Arc<AppState>) -> ! {
    match Schedule::from_str(expression) {
        Ok(schedule) => {
            let offset = *Local::now().offset();
            loop {
                let mut upcoming = schedule.upcoming(offset).take(1);
                if let Some(datetime) = upcoming.next() {
                    tokio::time::sleep_until(tokio::time::Instant::from_std(datetime_to_instant(datetime))).await;
                    run_maintenance(&app_state).await;
                }
            }
        }
        Err(err) => exit!("Failed to start scheduler: {}", err)
    }
}

pub async fn start_ad_token_sweeper(app_state: Arc<AppState>) -> ! {
    let mut interval = tokio::time::interval(Duration::from_secs(app_state.config.ads.token_sweep_secs.max(1)));
    loop {
        interval.tick().await;
        let removed = adblock_service::sweep_ad_tokens(app_state.kv.as_ref(), Utc::now());
        if removed > 0 {
            debug_if_enabled!("Swept {} expired keys", removed);
        }
    }
}

pub async fn start_recorder(app_state: Arc<AppState>) -> ! {
    let mut interval = tokio::time::interval(Duration::from_secs(app_state.config.recording.tick_secs.max(1)));
    loop {
        interval.tick().await;
        if let Err(err) = app_state.recorder.tick(&app_state.config, &app_state.repos, Utc::now()).await {
            error!("Recorder tick failed: {err}");
        }
    }
}

/// Spawns the cron maintenance jobs and the fixed interval workers.
pub fn spawn_schedulers(app_state: &Arc<AppState>) {
    for expression in app_state.config.maintenance_schedules() {
        let state = Arc::clone(app_state);
        tokio::spawn(async move { start_scheduler(&expression, state).await });
    }
    tokio::spawn(start_ad_token_sweeper(Arc::clone(app_state)));
    if app_state.config.recording.enabled {
        tokio::spawn(start_recorder(Arc::clone(app_state)));
    }
}
