//! Installation identity.
//!
//! Each installation carries one lazily created user id, persisted in the
//! snapshot alongside the entries. Local reads and writes are scoped to
//! it; remote vector records are not (see the service crate's scoping
//! notes).

use tracing::info;

use clipvault_core::{install_id, Result};

use crate::entries::FileEntryStore;

impl FileEntryStore {
    /// Return the installation user id, creating and persisting one on
    /// first use.
    pub async fn user_id(&self) -> Result<String> {
        let _guard = self.write_lock.lock().await;
        let mut snapshot = self.load_strict().await?;
        if let Some(user_id) = &snapshot.user_id {
            return Ok(user_id.clone());
        }
        let user_id = install_id();
        info!(user_id = %user_id, "created installation identity");
        snapshot.user_id = Some(user_id.clone());
        self.persist(&snapshot).await?;
        Ok(user_id)
    }

    /// Stamp the installation user id onto entries written before user
    /// scoping existed. Returns how many entries were updated.
    pub async fn migrate_legacy_entries(&self) -> Result<usize> {
        let user_id = self.user_id().await?;

        let _guard = self.write_lock.lock().await;
        let mut snapshot = self.load_strict().await?;
        let mut updated = 0;
        for entry in &mut snapshot.entries {
            if entry.user_id.is_none() {
                entry.user_id = Some(user_id.clone());
                updated += 1;
            }
        }
        if updated > 0 {
            self.persist(&snapshot).await?;
            info!(updated, "migrated legacy entries to installation identity");
        }
        Ok(updated)
    }
}
