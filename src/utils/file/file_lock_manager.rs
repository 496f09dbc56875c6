use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

/// One reader/writer lock per data file. Every read-modify-write of a file holds
/// the write guard for the whole cycle, so there is a single writer per entity.
#[derive(Clone)]
pub struct FileLockManager {
    locks: Arc<Mutex<HashMap<PathBuf, Arc<RwLock<()>>>>>,
}

pub type FileReadGuard = OwnedRwLockReadGuard<()>;
pub type FileWriteGuard = OwnedRwLockWriteGuard<()>;

impl FileLockManager {
    pub fn new() -> Self {
        Self {
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn read_lock(&self, path: &Path) -> FileReadGuard {
        self.get_or_create_lock(path).await.read_owned().await
    }

    pub async fn write_lock(&self, path: &Path) -> FileWriteGuard {
        self.get_or_create_lock(path).await.write_owned().await
    }

    async fn get_or_create_lock(&self, path: &Path) -> Arc<RwLock<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(path.to_path_buf()).or_insert_with(|| Arc::new(RwLock::new(()))))
    }
}

impl Default for FileLockManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FileLockManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileLockManager").finish()
    }
}
