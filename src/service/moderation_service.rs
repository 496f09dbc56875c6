use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::messaging::{send_message, MsgKind};
use crate::model::config::Config;
use crate::model::{ContentKind, FlagReason, FlagStatus, ModerationFlag};
use crate::repository::Repositories;
use crate::service::catalog_service::{content_exists, set_hidden};
use crate::streamhub_error::{StreamHubError, StreamHubErrorKind};
use crate::utils::{sanitize_text, MSG_ALREADY_REPORTED, MSG_CONTENT_NOT_FOUND, MSG_FLAG_ALREADY_RESOLVED, MSG_FLAG_NOT_FOUND};

const MAX_DETAILS_LEN: usize = 1000;

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub content_id: String,
    pub content_kind: ContentKind,
    pub reason: FlagReason,
    #[serde(default)]
    pub details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Dismiss,
    Action,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ResolveRequest {
    pub action: Resolution,
}

pub async fn report(cfg: &Config, repos: &Repositories, reporter_id: &str, req: &ReportRequest, now: DateTime<Utc>) -> Result<ModerationFlag, StreamHubError> {
    if !content_exists(repos, req.content_kind, &req.content_id).await {
        return Err(StreamHubError::not_found(MSG_CONTENT_NOT_FOUND));
    }
    let flag = repos.moderation_flags.update(|flags| {
        if flags.iter().any(|f| f.status == FlagStatus::Open && f.reporter_id == reporter_id
            && f.content_id == req.content_id && f.content_kind == req.content_kind) {
            return Err(StreamHubError::conflict(MSG_ALREADY_REPORTED));
        }
        let flag = ModerationFlag {
            id: uuid::Uuid::new_v4().to_string(),
            content_id: req.content_id.clone(),
            content_kind: req.content_kind,
            reporter_id: reporter_id.to_string(),
            reason: req.reason,
            details: sanitize_text(&req.details, MAX_DETAILS_LEN),
            status: FlagStatus::Open,
            created_at: now,
            resolved_at: None,
            resolved_by: None,
        };
        flags.push(flag.clone());
        Ok(flag)
    }).await?;
    send_message(MsgKind::Moderation, cfg.messaging.as_ref(),
                 &format!("New moderation flag on {} {} ({:?})", flag.content_kind, flag.content_id, flag.reason));
    Ok(flag)
}

pub async fn list_flags(repos: &Repositories, status: Option<FlagStatus>) -> Vec<ModerationFlag> {
    let mut flags = repos.moderation_flags.filter(|f| status.is_none_or(|s| f.status == s)).await;
    flags.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    flags
}

/// Dismisses or actions an open flag. Actioning hides the content and closes the other open flags on it.
/// The flag is claimed under the lock of the flags file, so only one resolution wins.
pub async fn resolve(repos: &Repositories, admin_id: &str, flag_id: &str, resolution: Resolution, now: DateTime<Utc>) -> Result<ModerationFlag, StreamHubError> {
    let status = if resolution == Resolution::Action { FlagStatus::Actioned } else { FlagStatus::Dismissed };
    let resolved = repos.moderation_flags.update(|flags| {
        let flag = flags.iter().find(|f| f.id == flag_id)
            .ok_or_else(|| StreamHubError::not_found(MSG_FLAG_NOT_FOUND))?;
        if flag.status != FlagStatus::Open {
            return Err(StreamHubError::validation(MSG_FLAG_ALREADY_RESOLVED));
        }
        let (content_id, content_kind) = (flag.content_id.clone(), flag.content_kind);
        let mut result = None;
        for f in flags.iter_mut().filter(|f| f.status == FlagStatus::Open) {
            let same_content = f.content_id == content_id && f.content_kind == content_kind;
            if f.id == flag_id || (resolution == Resolution::Action && same_content) {
                f.status = status;
                f.resolved_at = Some(now);
                f.resolved_by = Some(admin_id.to_string());
                if f.id == flag_id {
                    result = Some(f.clone());
                }
            }
        }
        result.ok_or_else(|| StreamHubError::not_found(MSG_FLAG_NOT_FOUND))
    }).await?;
    if resolution == Resolution::Action {
        match set_hidden(repos, resolved.content_kind, &resolved.content_id, true).await {
            Err(err) if err.kind == StreamHubErrorKind::NotFound => {
                warn!("Flagged {} {} no longer exists", resolved.content_kind, resolved.content_id);
            }
            result => result?,
        }
    }
    info!("Flag {} on {} {} resolved as {:?}", resolved.id, resolved.content_kind, resolved.content_id, resolved.status);
    Ok(resolved)
}
