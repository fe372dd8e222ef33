//! Atomic snapshot I/O shared by the entry store and the journal.

use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use clipvault_core::{Error, Result};

/// Write `data` to `path` atomically: write a sibling temp file, flush,
/// then rename over the target. Readers never observe a partial snapshot.
pub(crate) async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::Storage(format!("no parent directory for {}", path.display())))?;
    fs::create_dir_all(parent)
        .await
        .map_err(|e| Error::Storage(format!("create_dir_all({}): {}", parent.display(), e)))?;

    let tmp = path.with_extension("tmp");
    let mut file = fs::File::create(&tmp)
        .await
        .map_err(|e| Error::Storage(format!("create({}): {}", tmp.display(), e)))?;
    file.write_all(data)
        .await
        .map_err(|e| Error::Storage(format!("write({}): {}", tmp.display(), e)))?;
    file.flush()
        .await
        .map_err(|e| Error::Storage(format!("flush({}): {}", tmp.display(), e)))?;
    drop(file);

    fs::rename(&tmp, path)
        .await
        .map_err(|e| Error::Storage(format!("rename({} -> {}): {}", tmp.display(), path.display(), e)))
}
