use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use log::error;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::streamhub_error::{StreamHubError, StreamHubErrorKind};
use crate::utils::file::file_lock_manager::FileLockManager;
use crate::utils::{json_read_array, json_write_documents_to_file};

/// One entity file holding a json array of `T`.
///
/// Reads take the shared lock of the file, [`JsonStore::update`] holds the exclusive lock
/// for the whole read-modify-write cycle and replaces the file atomically.
pub struct JsonStore<T> {
    path: PathBuf,
    locks: FileLockManager,
    _record: PhantomData<fn() -> T>,
}

impl<T> JsonStore<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: PathBuf, locks: FileLockManager) -> Self {
        Self {
            path,
            locks,
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Vec<T> {
        let _guard = self.locks.read_lock(&self.path).await;
        json_read_array(&self.path)
    }

    pub async fn find<P>(&self, predicate: P) -> Option<T>
    where
        P: Fn(&T) -> bool,
    {
        self.load().await.into_iter().find(|item| predicate(item))
    }

    pub async fn filter<P>(&self, predicate: P) -> Vec<T>
    where
        P: Fn(&T) -> bool,
    {
        self.load().await.into_iter().filter(|item| predicate(item)).collect()
    }

    /// Runs `f` on the current records and persists them if `f` succeeds.
    pub async fn update<R, F>(&self, f: F) -> Result<R, StreamHubError>
    where
        F: FnOnce(&mut Vec<T>) -> Result<R, StreamHubError>,
    {
        let _guard = self.locks.write_lock(&self.path).await;
        let mut records: Vec<T> = json_read_array(&self.path);
        let result = f(&mut records)?;
        self.write(&records)?;
        Ok(result)
    }

    /// Appends a record and keeps at most `max_len` of the newest records, 0 keeps all.
    pub async fn append(&self, record: T, max_len: usize) -> Result<(), StreamHubError> {
        self.update(|records| {
            records.push(record);
            if max_len > 0 && records.len() > max_len {
                let overflow = records.len() - max_len;
                records.drain(..overflow);
            }
            Ok(())
        }).await
    }

    fn write(&self, records: &[T]) -> Result<(), StreamHubError> {
        json_write_documents_to_file(&self.path, records).map_err(|err| {
            error!("Failed to write {}: {err}", self.path.display());
            StreamHubError::new(StreamHubErrorKind::Info, format!("Failed to persist {}", self.path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::JsonStore;
    use crate::streamhub_error::StreamHubError;
    use crate::utils::file::file_lock_manager::FileLockManager;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store: JsonStore<u32> = JsonStore::new(dir.path().join("users.json"), FileLockManager::new());
        assert!(store.load().await.is_empty());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_failed_update_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let store: JsonStore<u32> = JsonStore::new(dir.path().join("codes.json"), FileLockManager::new());
        store.update(|records| { records.push(1); Ok(()) }).await.unwrap();
        let result: Result<(), StreamHubError> = store.update(|records| {
            records.push(2);
            Err(StreamHubError::validation("no"))
        }).await;
        assert!(result.is_err());
        assert_eq!(store.load().await, vec![1]);
    }

    #[tokio::test]
    async fn test_append_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let store: JsonStore<u32> = JsonStore::new(dir.path().join("events.json"), FileLockManager::new());
        for i in 0..5 {
            store.append(i, 3).await.unwrap();
        }
        assert_eq!(store.load().await, vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<JsonStore<u32>> = Arc::new(JsonStore::new(dir.path().join("counter.json"), FileLockManager::new()));
        let mut handles = vec![];
        for i in 0..20 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.update(|records| { records.push(i); Ok(()) }).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(store.load().await.len(), 20);
    }
}
