use chrono::{DateTime, Utc};

use crate::model::config::Config;
use crate::model::{TermsAcceptance, TermsStatus};
use crate::repository::Repositories;
use crate::streamhub_error::StreamHubError;
use crate::utils::MSG_TERMS_VERSION;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct AcceptTermsRequest {
    pub version: String,
}

pub async fn status(cfg: &Config, repos: &Repositories, user_id: &str) -> TermsStatus {
    let latest = repos.terms_acceptances.filter(|t| t.user_id == user_id).await
        .into_iter()
        .max_by_key(|t| t.accepted_at);
    TermsStatus {
        current_version: cfg.terms.version.clone(),
        accepted: latest.as_ref().is_some_and(|t| t.version == cfg.terms.version),
        accepted_version: latest.as_ref().map(|t| t.version.clone()),
        accepted_at: latest.map(|t| t.accepted_at),
    }
}

pub async fn accept(cfg: &Config, repos: &Repositories, user_id: &str, version: &str, ip: &str, now: DateTime<Utc>) -> Result<TermsStatus, StreamHubError> {
    if version.trim() != cfg.terms.version {
        return Err(StreamHubError::validation(MSG_TERMS_VERSION));
    }
    repos.terms_acceptances.update(|acceptances| {
        acceptances.retain(|t| !(t.user_id == user_id && t.version == cfg.terms.version));
        acceptances.push(TermsAcceptance {
            user_id: user_id.to_string(),
            version: cfg.terms.version.clone(),
            accepted_at: now,
            ip: ip.to_string(),
        });
        Ok(())
    }).await?;
    Ok(status(cfg, repos, user_id).await)
}
