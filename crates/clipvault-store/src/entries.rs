//! File-backed entry store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use clipvault_core::{defaults, entry_id, EntryStore, Error, Result};
use clipvault_core::Entry;

use crate::fsio::write_atomic;

/// On-disk snapshot document. Three top-level keys: the installation
/// identity, the entry collection, and a reserved categories list.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct Snapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub entries: Vec<Entry>,
    pub categories: Vec<String>,
}

/// JSON-snapshot implementation of [`EntryStore`].
///
/// Every mutation holds one writer lock across its read-modify-write, so
/// two interleaved saves cannot overwrite each other's append.
pub struct FileEntryStore {
    pub(crate) path: PathBuf,
    pub(crate) write_lock: Mutex<()>,
}

impl FileEntryStore {
    /// Create a store rooted at `base_dir`. The snapshot file is created
    /// lazily on first write.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: base_dir.into().join(defaults::STORE_FILE),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load for reading. Any failure degrades to an empty snapshot so
    /// listing operations keep working while storage is unavailable.
    pub(crate) async fn load_lenient(&self) -> Snapshot {
        match self.load_strict().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "snapshot unreadable, serving empty collection");
                Snapshot::default()
            }
        }
    }

    /// Load for mutating. A missing file is a fresh store; an unreadable
    /// or unparsable one is an error, so a corrupted snapshot is never
    /// silently clobbered by the subsequent write.
    pub(crate) async fn load_strict(&self) -> Result<Snapshot> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Snapshot::default())
            }
            Err(e) => {
                return Err(Error::Storage(format!(
                    "read({}): {}",
                    self.path.display(),
                    e
                )))
            }
        };
        serde_json::from_slice(&data)
            .map_err(|e| Error::Storage(format!("parse({}): {}", self.path.display(), e)))
    }

    pub(crate) async fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        let data = serde_json::to_vec_pretty(snapshot)?;
        write_atomic(&self.path, &data).await
    }

    fn filtered(entries: Vec<Entry>, user_id: Option<&str>) -> Vec<Entry> {
        match user_id {
            None => entries,
            Some(user) => entries
                .into_iter()
                .filter(|e| e.user_id.as_deref() == Some(user))
                .collect(),
        }
    }
}

#[async_trait]
impl EntryStore for FileEntryStore {
    #[instrument(skip(self, entry), fields(subsystem = "store", component = "file_store", op = "save", entry_id = %entry.id))]
    async fn save(&self, mut entry: Entry) -> Result<Entry> {
        let _guard = self.write_lock.lock().await;
        let mut snapshot = self.load_strict().await?;

        if entry.id.is_empty() {
            entry.id = entry_id("entry");
        }
        snapshot.entries.push(entry.clone());
        self.persist(&snapshot).await?;

        debug!(total = snapshot.entries.len(), "entry saved");
        Ok(entry)
    }

    async fn get_all(&self, user_id: Option<&str>) -> Result<Vec<Entry>> {
        let snapshot = self.load_lenient().await;
        Ok(Self::filtered(snapshot.entries, user_id))
    }

    async fn get_recent(&self, limit: usize, user_id: Option<&str>) -> Result<Vec<Entry>> {
        let snapshot = self.load_lenient().await;
        let mut entries = Self::filtered(snapshot.entries, user_id);
        // Stable sort: equal timestamps keep insertion order.
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(limit);
        Ok(entries)
    }

    #[instrument(skip(self), fields(subsystem = "store", component = "file_store", op = "delete", entry_id = id))]
    async fn delete(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut snapshot = self.load_strict().await?;
        let before = snapshot.entries.len();
        snapshot.entries.retain(|e| e.id != id);
        if snapshot.entries.len() == before {
            // Unknown id: nothing to write.
            return Ok(());
        }
        self.persist(&snapshot).await
    }

    #[instrument(skip(self, category), fields(subsystem = "store", component = "file_store", op = "categorize", entry_id = id))]
    async fn categorize(&self, id: &str, category: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut snapshot = self.load_strict().await?;
        match snapshot.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.category = category.to_string();
                self.persist(&snapshot).await
            }
            // Unknown id: no-op, not an error.
            None => Ok(()),
        }
    }

    async fn search_local(&self, query: &str, user_id: Option<&str>) -> Result<Vec<Entry>> {
        let needle = query.to_lowercase();
        let snapshot = self.load_lenient().await;
        Ok(Self::filtered(snapshot.entries, user_id)
            .into_iter()
            .filter(|e| e.searchable_text().to_lowercase().contains(&needle))
            .collect())
    }
}
