use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use chrono::{DateTime, Duration, Utc};
use log::{error, info, warn};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use crate::model::config::Config;
use crate::model::{Recording, RecordingConfig, RecordingStatus, User};
use crate::repository::Repositories;
use crate::streamhub_error::StreamHubError;
use crate::utils::{debug_if_enabled, sanitize_text, MSG_CONTENT_NOT_FOUND, MSG_PREMIUM_REQUIRED, MSG_RECORDING_DISABLED,
                   MSG_RECORDING_LIMIT, MSG_RECORDING_NOT_CANCELLABLE, MSG_RECORDING_NOT_FOUND, MSG_RECORDING_WINDOW};

const ERR_MISSED: &str = "missed";
const ERR_INTERRUPTED: &str = "interrupted";

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRecordingRequest {
    pub channel_id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

fn check_window(cfg: &RecordingConfig, start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), StreamHubError> {
    if end <= start || end <= now || end - start > Duration::minutes(cfg.max_duration_mins) {
        return Err(StreamHubError::validation(MSG_RECORDING_WINDOW));
    }
    Ok(())
}

pub async fn schedule(cfg: &Config, repos: &Repositories, user: &User, req: &ScheduleRecordingRequest, now: DateTime<Utc>) -> Result<Recording, StreamHubError> {
    if !cfg.recording.enabled {
        return Err(StreamHubError::forbidden(MSG_RECORDING_DISABLED));
    }
    if !user.is_premium(now) {
        return Err(StreamHubError::forbidden(MSG_PREMIUM_REQUIRED));
    }
    check_window(&cfg.recording, req.start_at, req.end_at, now)?;
    let channel = repos.channels.find(|c| c.id == req.channel_id && !c.hidden).await
        .ok_or_else(|| StreamHubError::not_found(MSG_CONTENT_NOT_FOUND))?;
    let title = req.title.as_deref().map(|t| sanitize_text(t, 200)).filter(|t| !t.is_empty())
        .unwrap_or_else(|| channel.name.clone());
    let max_concurrent = cfg.recording.max_concurrent;

    repos.recordings.update(|recordings| {
        let overlapping = recordings.iter()
            .filter(|r| r.user_id == user.id && r.is_active() && r.overlaps(req.start_at, req.end_at))
            .count();
        if overlapping >= max_concurrent {
            return Err(StreamHubError::conflict(MSG_RECORDING_LIMIT));
        }
        let recording = Recording {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            channel_id: channel.id.clone(),
            title,
            start_at: req.start_at,
            end_at: req.end_at,
            status: RecordingStatus::Scheduled,
            file_path: None,
            error: None,
            created_at: now,
        };
        recordings.push(recording.clone());
        Ok(recording)
    }).await
}

pub async fn cancel(repos: &Repositories, user_id: &str, recording_id: &str) -> Result<Recording, StreamHubError> {
    repos.recordings.update(|recordings| {
        let recording = recordings.iter_mut().find(|r| r.id == recording_id && r.user_id == user_id)
            .ok_or_else(|| StreamHubError::not_found(MSG_RECORDING_NOT_FOUND))?;
        if recording.status != RecordingStatus::Scheduled {
            return Err(StreamHubError::validation(MSG_RECORDING_NOT_CANCELLABLE));
        }
        recording.status = RecordingStatus::Cancelled;
        Ok(recording.clone())
    }).await
}

pub async fn list(repos: &Repositories, user_id: &str) -> Vec<Recording> {
    let mut recordings = repos.recordings.filter(|r| r.user_id == user_id).await;
    recordings.sort_by(|a, b| a.start_at.cmp(&b.start_at));
    recordings
}

/// Scheduled recordings split into due ones and ones whose window already passed.
pub fn due_and_missed(recordings: &[Recording], now: DateTime<Utc>) -> (Vec<Recording>, Vec<String>) {
    let mut due = vec![];
    let mut missed = vec![];
    for recording in recordings.iter().filter(|r| r.status == RecordingStatus::Scheduled) {
        if recording.end_at <= now {
            missed.push(recording.id.clone());
        } else if recording.start_at <= now {
            due.push(recording.clone());
        }
    }
    (due, missed)
}

/// Outcome of one recorder pass, keyed by recording id.
#[derive(Debug, Default)]
struct TickUpdate {
    started: HashMap<String, PathBuf>,
    finished: HashMap<String, Result<(), String>>,
    missed: Vec<String>,
}

/// Writes a recorder pass into the records. Only scheduled recordings can start and only
/// active ones can finish, so a cancel racing the pass wins. Returns the ids of started
/// processes whose recording is no longer scheduled.
fn apply_tick(recordings: &mut [Recording], update: &mut TickUpdate) -> Vec<String> {
    let mut orphaned = vec![];
    for recording in recordings.iter_mut() {
        if let Some(file) = update.started.remove(&recording.id) {
            if recording.status == RecordingStatus::Scheduled {
                recording.status = RecordingStatus::Recording;
                recording.file_path = Some(file.to_string_lossy().to_string());
            } else {
                orphaned.push(recording.id.clone());
            }
        } else if let Some(result) = update.finished.remove(&recording.id) {
            if !recording.is_active() {
                continue;
            }
            match result {
                Ok(()) => recording.status = RecordingStatus::Completed,
                Err(err) => {
                    recording.status = RecordingStatus::Failed;
                    recording.error = Some(err);
                }
            }
        } else if update.missed.contains(&recording.id) && recording.status == RecordingStatus::Scheduled {
            recording.status = RecordingStatus::Failed;
            recording.error = Some(ERR_MISSED.to_string());
        }
    }
    orphaned.extend(update.started.drain().map(|(id, _)| id));
    orphaned
}

/// Owns the running ffmpeg processes.
#[derive(Debug, Default)]
pub struct RecorderManager {
    processes: Mutex<HashMap<String, Child>>,
}

impl RecorderManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn running(&self) -> usize {
        self.processes.lock().await.len()
    }

    fn build_command(ffmpeg: &str, url: &str, secs: i64, file: &Path) -> Command {
        let mut cmd = Command::new(ffmpeg);
        cmd.arg("-y")
            .arg("-i").arg(url)
            .arg("-t").arg(secs.to_string())
            .arg("-c").arg("copy")
            .arg(file)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    async fn collect_finished(&self, update: &mut TickUpdate) {
        let mut processes = self.processes.lock().await;
        let mut done = vec![];
        for (id, child) in processes.iter_mut() {
            match child.try_wait() {
                Ok(Some(status)) if status.success() => { update.finished.insert(id.clone(), Ok(())); done.push(id.clone()); }
                Ok(Some(status)) => { update.finished.insert(id.clone(), Err(format!("ffmpeg exited with {status}"))); done.push(id.clone()); }
                Ok(None) => {}
                Err(err) => { update.finished.insert(id.clone(), Err(err.to_string())); done.push(id.clone()); }
            }
        }
        for id in done {
            processes.remove(&id);
        }
    }

    async fn start_due(&self, cfg: &Config, repos: &Repositories, due: Vec<Recording>, now: DateTime<Utc>, update: &mut TickUpdate) {
        let mut processes = self.processes.lock().await;
        for recording in due {
            let Some(channel) = repos.channels.find(|c| c.id == recording.channel_id).await else {
                update.finished.insert(recording.id.clone(), Err(MSG_CONTENT_NOT_FOUND.to_string()));
                continue;
            };
            let file = cfg.t_recording_path.join(format!("{}.ts", recording.id));
            let secs = (recording.end_at - now).num_seconds().max(1);
            match Self::build_command(&cfg.recording.ffmpeg, &channel.stream_url, secs, &file).spawn() {
                Ok(child) => {
                    info!("Recording {} started for {secs}s", recording.id);
                    processes.insert(recording.id.clone(), child);
                    update.started.insert(recording.id, file);
                }
                Err(err) => {
                    error!("Failed to start ffmpeg for recording {}: {err}", recording.id);
                    update.finished.insert(recording.id, Err(err.to_string()));
                }
            }
        }
    }

    /// One recorder pass: reaps exited processes, fails missed windows and starts due recordings.
    pub async fn tick(&self, cfg: &Config, repos: &Repositories, now: DateTime<Utc>) -> Result<(), StreamHubError> {
        let mut update = TickUpdate::default();
        self.collect_finished(&mut update).await;

        let recordings = repos.recordings.load().await;
        let (due, missed) = due_and_missed(&recordings, now);
        update.missed = missed;
        let lost: Vec<String> = {
            let processes = self.processes.lock().await;
            recordings.iter()
                .filter(|r| r.status == RecordingStatus::Recording
                    && !processes.contains_key(&r.id) && !update.finished.contains_key(&r.id))
                .map(|r| r.id.clone())
                .collect()
        };
        for id in lost {
            warn!("Recording {id} has no running process");
            update.finished.insert(id, Err(ERR_INTERRUPTED.to_string()));
        }
        if !due.is_empty() {
            self.start_due(cfg, repos, due, now, &mut update).await;
        }
        if update.started.is_empty() && update.finished.is_empty() && update.missed.is_empty() {
            return Ok(());
        }
        debug_if_enabled!("Recorder tick: {} started, {} finished, {} missed", update.started.len(), update.finished.len(), update.missed.len());
        let orphaned = repos.recordings.update(|recordings| Ok(apply_tick(recordings, &mut update))).await?;
        if !orphaned.is_empty() {
            self.kill(&orphaned).await;
        }
        Ok(())
    }

    async fn kill(&self, ids: &[String]) {
        let mut processes = self.processes.lock().await;
        for id in ids {
            if let Some(mut child) = processes.remove(id) {
                info!("Stopping recording {id}, it is no longer scheduled");
                if let Err(err) = child.start_kill() {
                    error!("Failed to stop recording {id}: {err}");
                }
            }
        }
    }

    /// Kills every running recording process.
    pub async fn stop_all(&self) {
        let mut processes = self.processes.lock().await;
        for (id, child) in processes.iter_mut() {
            if let Err(err) = child.start_kill() {
                error!("Failed to stop recording {id}: {err}");
            }
        }
        processes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{apply_tick, cancel, due_and_missed, list, schedule, RecorderManager, ScheduleRecordingRequest, TickUpdate};
    use std::path::PathBuf;
    use crate::model::user::tests::test_user;
    use crate::model::{RecordingStatus, User};
    use crate::service::catalog_service::tests::test_channel;
    use crate::service::tests::{test_env, TestEnv};
    use crate::streamhub_error::StreamHubErrorKind;
    use chrono::{DateTime, Duration, Utc};

    fn premium_user(now: DateTime<Utc>) -> User {
        let mut user = test_user("anna", now);
        user.extend_subscription(now, 30);
        user
    }

    fn request(start: DateTime<Utc>, minutes: i64) -> ScheduleRecordingRequest {
        ScheduleRecordingRequest { channel_id: "c1".to_string(), title: None, start_at: start, end_at: start + Duration::minutes(minutes) }
    }

    async fn env_with_channel() -> TestEnv {
        let env = test_env();
        env.repos.channels.update(|c| { c.push(test_channel("c1", 1, false)); Ok(()) }).await.unwrap();
        env
    }

    #[tokio::test]
    async fn test_schedule_rules() {
        let env = env_with_channel().await;
        let now = Utc::now();
        let user = premium_user(now);
        let start = now + Duration::hours(1);

        let free = test_user("bob", now);
        assert_eq!(schedule(&env.cfg, &env.repos, &free, &request(start, 30), now).await.unwrap_err().kind, StreamHubErrorKind::Forbidden);
        assert_eq!(schedule(&env.cfg, &env.repos, &user, &request(start, 241), now).await.unwrap_err().kind, StreamHubErrorKind::Validation);
        assert!(schedule(&env.cfg, &env.repos, &user, &request(now - Duration::hours(2), 60), now).await.is_err());
        let mut unknown = request(start, 30);
        unknown.channel_id = "nope".to_string();
        assert_eq!(schedule(&env.cfg, &env.repos, &user, &unknown, now).await.unwrap_err().kind, StreamHubErrorKind::NotFound);

        let first = schedule(&env.cfg, &env.repos, &user, &request(start, 60), now).await.unwrap();
        assert_eq!(first.title, "Channel c1");
        schedule(&env.cfg, &env.repos, &user, &request(start + Duration::minutes(30), 60), now).await.unwrap();
        let err = schedule(&env.cfg, &env.repos, &user, &request(start + Duration::minutes(45), 10), now).await.unwrap_err();
        assert_eq!(err.kind, StreamHubErrorKind::Conflict);

        cancel(&env.repos, "anna", &first.id).await.unwrap();
        assert!(schedule(&env.cfg, &env.repos, &user, &request(start + Duration::minutes(45), 10), now).await.is_ok());
        assert!(cancel(&env.repos, "anna", &first.id).await.is_err());
        assert_eq!(cancel(&env.repos, "bob", &first.id).await.unwrap_err().kind, StreamHubErrorKind::NotFound);
        assert_eq!(list(&env.repos, "anna").await.len(), 3);
    }

    #[tokio::test]
    async fn test_tick_marks_missed_and_failed() {
        let mut env = env_with_channel().await;
        env.cfg.recording.ffmpeg = env.cfg.t_data_path.join("no-ffmpeg").to_string_lossy().to_string();
        let now = Utc::now();
        let user = premium_user(now);
        let due = schedule(&env.cfg, &env.repos, &user, &request(now + Duration::minutes(5), 30), now).await.unwrap();
        let missed = schedule(&env.cfg, &env.repos, &user, &request(now + Duration::hours(2), 30), now).await.unwrap();

        let later = now + Duration::minutes(10);
        let recordings = env.repos.recordings.load().await;
        let (starting, _) = due_and_missed(&recordings, later);
        assert_eq!(starting.len(), 1);

        let recorder = RecorderManager::new();
        recorder.tick(&env.cfg, &env.repos, later).await.unwrap();
        let failed = env.repos.recordings.find(|r| r.id == due.id).await.unwrap();
        assert_eq!(failed.status, RecordingStatus::Failed);
        assert_eq!(recorder.running().await, 0);

        recorder.tick(&env.cfg, &env.repos, now + Duration::hours(3)).await.unwrap();
        let missed = env.repos.recordings.find(|r| r.id == missed.id).await.unwrap();
        assert_eq!(missed.status, RecordingStatus::Failed);
        assert_eq!(missed.error.as_deref(), Some("missed"));
    }

    #[tokio::test]
    async fn test_tick_fails_recording_without_process() {
        let env = env_with_channel().await;
        let now = Utc::now();
        let user = premium_user(now);
        let recording = schedule(&env.cfg, &env.repos, &user, &request(now + Duration::minutes(5), 30), now).await.unwrap();
        env.repos.recordings.update(|recordings| {
            recordings[0].status = RecordingStatus::Recording;
            Ok(())
        }).await.unwrap();

        RecorderManager::new().tick(&env.cfg, &env.repos, now + Duration::minutes(10)).await.unwrap();
        let lost = env.repos.recordings.find(|r| r.id == recording.id).await.unwrap();
        assert_eq!(lost.status, RecordingStatus::Failed);
        assert_eq!(lost.error.as_deref(), Some("interrupted"));
    }

    #[tokio::test]
    async fn test_cancel_during_tick_is_kept() {
        let env = env_with_channel().await;
        let now = Utc::now();
        let user = premium_user(now);
        let cancelled = schedule(&env.cfg, &env.repos, &user, &request(now + Duration::minutes(5), 30), now).await.unwrap();
        let started = schedule(&env.cfg, &env.repos, &user, &request(now + Duration::minutes(5), 30), now).await.unwrap();
        cancel(&env.repos, "anna", &cancelled.id).await.unwrap();

        let mut update = TickUpdate::default();
        update.started.insert(cancelled.id.clone(), PathBuf::from("/tmp/a.ts"));
        update.started.insert(started.id.clone(), PathBuf::from("/tmp/b.ts"));
        update.started.insert("deleted".to_string(), PathBuf::from("/tmp/c.ts"));
        update.finished.insert(cancelled.id.clone(), Err("ffmpeg exited".to_string()));
        let mut recordings = env.repos.recordings.load().await;
        let mut orphaned = apply_tick(&mut recordings, &mut update);
        orphaned.sort();

        let mut expected = vec![cancelled.id.clone(), "deleted".to_string()];
        expected.sort();
        assert_eq!(orphaned, expected);
        let by_id = |id: &str| recordings.iter().find(|r| r.id == id).unwrap().clone();
        assert_eq!(by_id(&cancelled.id).status, RecordingStatus::Cancelled);
        assert!(by_id(&cancelled.id).file_path.is_none());
        assert_eq!(by_id(&started.id).status, RecordingStatus::Recording);
        assert_eq!(by_id(&started.id).file_path.as_deref(), Some("/tmp/b.ts"));
    }
}
