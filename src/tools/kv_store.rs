use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use log::{debug, error};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::utils::json_write_documents_to_file;

/// Process state shared between requests: rate limit windows, login attempts, ad tokens.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    /// Stores the value, `None` keeps it until removed.
    fn set(&self, key: &str, value: Value, ttl: Option<Duration>);
    fn remove(&self, key: &str) -> Option<Value>;
    /// Increments a counter and returns the new value. The ttl starts with the first increment.
    fn increment(&self, key: &str, ttl: Duration) -> u64;
    fn keys(&self, prefix: &str) -> Vec<String>;
    /// Drops expired entries, returns the number of removed keys.
    fn sweep(&self, now: DateTime<Utc>) -> usize;
    fn snapshot(&self, path: &Path) -> io::Result<()>;
}

pub fn kv_get<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    store.get(key).and_then(|value| serde_json::from_value(value).ok())
}

pub fn kv_set<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T, ttl: Option<Duration>) {
    match serde_json::to_value(value) {
        Ok(json) => store.set(key, json, ttl),
        Err(err) => error!("Failed to store {key}: {err}"),
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct KvEntry {
    value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

impl KvEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|ts| ts <= now)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, KvEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores a snapshot, a missing or unreadable file starts empty.
    pub fn load(path: &Path) -> Self {
        let store = Self::new();
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<HashMap<String, KvEntry>>(&content) {
                Ok(mut entries) => {
                    let now = Utc::now();
                    entries.retain(|_, entry| !entry.is_expired(now));
                    debug!("Restored {} keys from {}", entries.len(), path.display());
                    *store.entries.write().unwrap_or_else(PoisonError::into_inner) = entries;
                }
                Err(err) => error!("Failed to read kv snapshot {}: {err}", path.display()),
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => error!("Failed to read kv snapshot {}: {err}", path.display()),
        }
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key)
            .filter(|entry| !entry.is_expired(Utc::now()))
            .map(|entry| entry.value.clone())
    }

    fn set(&self, key: &str, value: Value, ttl: Option<Duration>) {
        let expires_at = ttl.map(|d| Utc::now() + d);
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), KvEntry { value, expires_at });
    }

    fn remove(&self, key: &str) -> Option<Value> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .map(|entry| entry.value)
    }

    fn increment(&self, key: &str, ttl: Duration) -> u64 {
        let now = Utc::now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.entry(key.to_string()).or_insert_with(|| KvEntry { value: Value::from(0u64), expires_at: Some(now + ttl) });
        if entry.is_expired(now) {
            entry.value = Value::from(0u64);
            entry.expires_at = Some(now + ttl);
        }
        let count = entry.value.as_u64().unwrap_or(0) + 1;
        entry.value = Value::from(count);
        count
    }

    fn keys(&self, prefix: &str) -> Vec<String> {
        let now = Utc::now();
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(key, entry)| key.starts_with(prefix) && !entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    fn snapshot(&self, path: &Path) -> io::Result<()> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner).clone();
        json_write_documents_to_file(path, &entries)
    }
}
