//! Startup reconciliation of the two stores.
//!
//! The remote index and the local mirror are written without a shared
//! transaction, so a crash between the two writes leaves them divergent.
//! Every dual-store mutation records an intent in the pending-write
//! journal first; this pass replays whatever survived the previous run:
//!
//! - a pending **save** whose local mirror exists is re-embedded from the
//!   (untruncated) local copy and re-upserted — the upsert is idempotent
//!   by id, so an already-stored vector is simply replaced;
//! - a pending **save** with no local copy means the capture never
//!   completed; the possibly-orphaned remote vector is deleted;
//! - a pending **delete** is re-issued against both stores.
//!
//! A replay that fails keeps its journal record and is retried on the
//! next launch.

use serde::Serialize;
use tracing::{info, warn};

use clipvault_core::{EntryStore, Result, VectorMetadata, VectorRecord};
use clipvault_store::{PendingKind, PendingOp};

use crate::service::{embedding_input, Clients, KnowledgeService};

/// Outcome counts of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Pending saves re-upserted from the local copy.
    pub replayed_saves: usize,
    /// Pending saves with no local copy; remote vector deleted.
    pub abandoned_saves: usize,
    /// Pending deletes re-issued.
    pub replayed_deletes: usize,
    /// Replays that failed and stay journaled for the next launch.
    pub failed: usize,
}

impl ReconcileReport {
    /// Whether the pass had anything to do.
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

enum Replay {
    Resaved,
    Abandoned,
    Redeleted,
}

impl KnowledgeService {
    /// Replay pending dual-store writes left over from a previous run.
    ///
    /// A no-op when the journal is empty; otherwise the remote clients
    /// are initialized first, so an unconfigured service reports a
    /// configuration error instead of silently skipping repair.
    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        let pending = self.journal().pending().await;
        let mut report = ReconcileReport::default();
        if pending.is_empty() {
            return Ok(report);
        }

        let clients = self.ensure_ready().await?;
        info!(
            subsystem = "service",
            component = "reconcile",
            count = pending.len(),
            "replaying pending dual-store writes"
        );

        for op in pending {
            match self.replay(&clients, &op).await {
                Ok(Replay::Resaved) => report.replayed_saves += 1,
                Ok(Replay::Abandoned) => report.abandoned_saves += 1,
                Ok(Replay::Redeleted) => report.replayed_deletes += 1,
                Err(e) => {
                    warn!(entry_id = %op.id, error = %e, "replay failed, keeping journal record");
                    report.failed += 1;
                }
            }
        }

        info!(
            replayed_saves = report.replayed_saves,
            abandoned_saves = report.abandoned_saves,
            replayed_deletes = report.replayed_deletes,
            failed = report.failed,
            "reconciliation complete"
        );
        Ok(report)
    }

    async fn replay(&self, clients: &Clients, op: &PendingOp) -> Result<Replay> {
        match op.kind {
            PendingKind::Save => {
                let local = self
                    .store()
                    .get_all(None)
                    .await?
                    .into_iter()
                    .find(|e| e.id == op.id);
                match local {
                    Some(entry) => {
                        let vector = clients.embedder.embed(&embedding_input(&entry)).await?;
                        let record = VectorRecord {
                            id: entry.id.clone(),
                            values: vector,
                            metadata: VectorMetadata::from_entry(&entry),
                        };
                        clients.index.upsert(&[record]).await?;
                        self.journal().clear(&op.id).await?;
                        Ok(Replay::Resaved)
                    }
                    None => {
                        clients.index.delete(&[op.id.clone()]).await?;
                        self.journal().clear(&op.id).await?;
                        Ok(Replay::Abandoned)
                    }
                }
            }
            PendingKind::Delete => {
                clients.index.delete(&[op.id.clone()]).await?;
                self.store().delete(&op.id).await?;
                self.journal().clear(&op.id).await?;
                Ok(Replay::Redeleted)
            }
        }
    }
}
