use std::sync::Arc;

use crate::model::config::Config;
use crate::repository::Repositories;
use crate::service::recording_service::RecorderManager;
use crate::tools::kv_store::KeyValueStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub http_client: Arc<reqwest::Client>,
    pub repos: Arc<Repositories>,
    pub kv: Arc<dyn KeyValueStore>,
    pub recorder: Arc<RecorderManager>,
}
