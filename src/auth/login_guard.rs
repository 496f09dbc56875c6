use chrono::{DateTime, Duration, Utc};

use crate::streamhub_error::{StreamHubError, StreamHubErrorKind};
use crate::tools::kv_store::{kv_get, kv_set, KeyValueStore};
use crate::utils::MSG_TOO_MANY_ATTEMPTS;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct FailedLogins {
    count: u32,
    window_start: DateTime<Utc>,
}

/// Counts failed logins per client ip inside a fixed window.
pub struct LoginGuard<'a> {
    store: &'a dyn KeyValueStore,
    max_attempts: u32,
    window: Duration,
}

fn guard_key(ip: &str) -> String {
    format!("login:{ip}")
}

impl<'a> LoginGuard<'a> {
    pub fn new(store: &'a dyn KeyValueStore, max_attempts: u32, window_mins: i64) -> Self {
        Self { store, max_attempts, window: Duration::minutes(window_mins) }
    }

    fn current(&self, ip: &str, now: DateTime<Utc>) -> Option<FailedLogins> {
        kv_get::<FailedLogins>(self.store, &guard_key(ip)).filter(|f| f.window_start + self.window > now)
    }

    pub fn check(&self, ip: &str, now: DateTime<Utc>) -> Result<(), StreamHubError> {
        match self.current(ip, now) {
            Some(failed) if failed.count >= self.max_attempts => {
                Err(StreamHubError::new(StreamHubErrorKind::TooManyRequests, MSG_TOO_MANY_ATTEMPTS.to_string()))
            }
            _ => Ok(()),
        }
    }

    pub fn record_failure(&self, ip: &str, now: DateTime<Utc>) {
        let failed = match self.current(ip, now) {
            Some(mut failed) => {
                failed.count += 1;
                failed
            }
            None => FailedLogins { count: 1, window_start: now },
        };
        let remaining = failed.window_start + self.window - now;
        kv_set(self.store, &guard_key(ip), &failed, Some(remaining));
    }

    pub fn reset(&self, ip: &str) {
        self.store.remove(&guard_key(ip));
    }
}

#[cfg(test)]
mod tests {
    use super::LoginGuard;
    use crate::streamhub_error::StreamHubErrorKind;
    use crate::tools::kv_store::MemoryStore;
    use chrono::{Duration, Utc};

    #[test]
    fn test_lockout_per_ip() {
        let store = MemoryStore::new();
        let guard = LoginGuard::new(&store, 5, 15);
        let now = Utc::now();
        for _ in 0..4 {
            guard.record_failure("10.0.0.1", now);
        }
        assert!(guard.check("10.0.0.1", now).is_ok());
        guard.record_failure("10.0.0.1", now);
        let err = guard.check("10.0.0.1", now).unwrap_err();
        assert_eq!(err.kind, StreamHubErrorKind::TooManyRequests);
        assert!(guard.check("10.0.0.2", now).is_ok());
        assert!(guard.check("10.0.0.1", now + Duration::minutes(16)).is_ok());
    }

    #[test]
    fn test_success_resets() {
        let store = MemoryStore::new();
        let guard = LoginGuard::new(&store, 5, 15);
        let now = Utc::now();
        for _ in 0..5 {
            guard.record_failure("10.0.0.1", now);
        }
        guard.reset("10.0.0.1");
        assert!(guard.check("10.0.0.1", now).is_ok());
    }
}
