//! Durable pending-write journal.
//!
//! The two stores (remote index, local mirror) are never transacted
//! together; a crash between the remote upsert and the local write leaves
//! them inconsistent. The journal records an intent before the remote
//! mutation and clears it after both stores are written, so whatever
//! survives a crash names exactly the entries that may have diverged.
//! The service replays survivors at startup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::warn;

use clipvault_core::{defaults, Error, Result};

use crate::fsio::write_atomic;

/// What the interrupted operation was doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingKind {
    Save,
    Delete,
}

/// One recorded intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOp {
    pub id: String,
    pub kind: PendingKind,
    pub recorded_at: DateTime<Utc>,
}

/// File-backed journal of in-flight dual-store writes.
pub struct WriteJournal {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl WriteJournal {
    /// Create a journal rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: base_dir.into().join(defaults::JOURNAL_FILE),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record an intent for `id`. A prior intent for the same id is
    /// replaced.
    pub async fn record(&self, id: &str, kind: PendingKind) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut ops = self.load_strict().await?;
        ops.retain(|op| op.id != id);
        ops.push(PendingOp {
            id: id.to_string(),
            kind,
            recorded_at: Utc::now(),
        });
        self.persist(&ops).await
    }

    /// Clear the intent for `id` after both stores are written. Unknown
    /// ids are a no-op.
    pub async fn clear(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut ops = self.load_strict().await?;
        let before = ops.len();
        ops.retain(|op| op.id != id);
        if ops.len() == before {
            return Ok(());
        }
        self.persist(&ops).await
    }

    /// Intents that survived a previous run. An unreadable journal
    /// degrades to empty (reconciliation then has nothing to repair,
    /// which matches the pre-journal behavior).
    pub async fn pending(&self) -> Vec<PendingOp> {
        match self.load_strict().await {
            Ok(ops) => ops,
            Err(e) => {
                warn!(error = %e, "journal unreadable, skipping replay");
                Vec::new()
            }
        }
    }

    async fn load_strict(&self) -> Result<Vec<PendingOp>> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
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

    async fn persist(&self, ops: &[PendingOp]) -> Result<()> {
        let data = serde_json::to_vec_pretty(ops)?;
        write_atomic(&self.path, &data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_and_clear_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let journal = WriteJournal::new(dir.path());

        journal.record("text_1_a", PendingKind::Save).await.unwrap();
        journal.record("text_2_b", PendingKind::Delete).await.unwrap();

        let pending = journal.pending().await;
        assert_eq!(pending.len(), 2);

        journal.clear("text_1_a").await.unwrap();
        let pending = journal.pending().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "text_2_b");
        assert_eq!(pending[0].kind, PendingKind::Delete);
    }

    #[tokio::test]
    async fn test_re_recording_replaces_prior_intent() {
        let dir = tempfile::tempdir().unwrap();
        let journal = WriteJournal::new(dir.path());

        journal.record("text_1_a", PendingKind::Save).await.unwrap();
        journal.record("text_1_a", PendingKind::Delete).await.unwrap();

        let pending = journal.pending().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].kind, PendingKind::Delete);
    }

    #[tokio::test]
    async fn test_clear_unknown_id_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let journal = WriteJournal::new(dir.path());
        journal.clear("never-recorded").await.unwrap();
        assert!(journal.pending().await.is_empty());
    }

    #[tokio::test]
    async fn test_pending_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let journal = WriteJournal::new(dir.path());
            journal.record("text_1_a", PendingKind::Save).await.unwrap();
        }
        let reopened = WriteJournal::new(dir.path());
        assert_eq!(reopened.pending().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_journal_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let journal = WriteJournal::new(dir.path());
        journal.record("text_1_a", PendingKind::Save).await.unwrap();
        tokio::fs::write(journal.path(), b"[{broken").await.unwrap();
        assert!(journal.pending().await.is_empty());
    }
}
