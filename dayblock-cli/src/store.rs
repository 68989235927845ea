//! JSON file persistence around the in-memory store.

use anyhow::{Context, Result};
use dayblock_core::{MemoryStorage, StoreSnapshot};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

pub struct JsonFileStore {
    path: PathBuf,
    storage: Arc<MemoryStorage>,
}

impl JsonFileStore {
    /// Load `path`; a missing file starts an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let snapshot = if path.exists() {
            let s = fs::read_to_string(&path)
                .with_context(|| format!("read {}", path.display()))?;
            serde_json::from_str(&s).with_context(|| format!("parse {}", path.display()))?
        } else {
            StoreSnapshot::default()
        };
        debug!(
            path = %path.display(),
            tasks = snapshot.tasks.len(),
            blocks = snapshot.time_blocks.len(),
            "store loaded"
        );
        Ok(Self {
            path,
            storage: Arc::new(MemoryStorage::from_snapshot(snapshot)),
        })
    }

    pub fn storage(&self) -> Arc<MemoryStorage> {
        Arc::clone(&self.storage)
    }

    /// Write the current contents: temp file next to the target, then rename.
    pub async fn save(&self) -> Result<()> {
        let snapshot = self.storage.snapshot().await;
        let json = serde_json::to_string_pretty(&snapshot).context("serialize store")?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("rename {} -> {}", tmp.display(), self.path.display()))?;
        debug!(path = %self.path.display(), "store saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dayblock_core::{Settings, Storage, Task};

    #[tokio::test]
    async fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("store.json")).unwrap();
        assert!(store.storage().list_tasks().await.unwrap().is_empty());
        assert!(store.storage().get_settings().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn saved_contents_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = JsonFileStore::open(&path).unwrap();
        store
            .storage()
            .create_task(Task::new("t1", "Plan sprint"))
            .await
            .unwrap();
        store.storage().upsert_settings(Settings::default()).await.unwrap();
        store.save().await.unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let reopened = JsonFileStore::open(&path).unwrap();
        let tasks = reopened.storage().list_tasks().await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Plan sprint");
        assert_eq!(
            reopened.storage().get_settings().await.unwrap(),
            Some(Settings::default())
        );
    }

    #[test]
    fn corrupt_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{ not json").unwrap();

        let err = JsonFileStore::open(&path).err().unwrap();
        assert!(format!("{err:#}").contains("store.json"));
    }
}
