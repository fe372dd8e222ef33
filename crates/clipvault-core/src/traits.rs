//! Core traits for clipvault abstractions.
//!
//! These traits define the interfaces that concrete implementations must
//! satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;

use crate::defaults;
use crate::error::Result;
use crate::models::{Entry, SearchMatch, VectorRecord};

/// Backend that turns text into fixed-length normalized vectors.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Embed a single text. The returned vector is L2-normalized.
    ///
    /// Input length limits are the caller's concern; this layer performs
    /// no truncation and no retries.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Target embedding dimension. Mismatching responses are logged but
    /// still returned.
    fn dimension(&self) -> usize;

    /// Model identifier used by this backend.
    fn model_name(&self) -> &str;

    /// Probe reachability by embedding a fixed string.
    ///
    /// Every failure is reported as `false`, never as an error.
    async fn health_check(&self) -> bool {
        match self.embed(defaults::HEALTH_PROBE).await {
            Ok(v) => !v.is_empty(),
            Err(_) => false,
        }
    }
}

/// Remote vector index: upsert, nearest-neighbor query, delete.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert-or-replace records by id. Re-upserting an id replaces the
    /// prior vector and metadata entirely; nothing is merged.
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()>;

    /// Return up to `top_k` nearest records. An empty index yields an
    /// empty list, not an error.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<SearchMatch>>;

    /// Remove vectors by id. Unknown ids are a no-op.
    async fn delete(&self, ids: &[String]) -> Result<()>;
}

/// Durable local mirror of saved entries.
///
/// Reads are best-effort (storage trouble degrades to empty collections so
/// listings stay functional); writes propagate failures.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Append an entry. A missing id or timestamp is filled in; the stored
    /// entry is returned.
    async fn save(&self, entry: Entry) -> Result<Entry>;

    /// All entries, optionally filtered to one installation. No filter
    /// returns everything, cross-user.
    async fn get_all(&self, user_id: Option<&str>) -> Result<Vec<Entry>>;

    /// Most recent entries by capture timestamp, newest first.
    async fn get_recent(&self, limit: usize, user_id: Option<&str>) -> Result<Vec<Entry>>;

    /// Remove the entry with this id. Unknown ids are a no-op.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Set an entry's category in place. Unknown ids are a no-op.
    async fn categorize(&self, id: &str, category: &str) -> Result<()>;

    /// Case-insensitive substring search over content, title, category,
    /// and nearby headings. Results keep insertion order.
    async fn search_local(&self, query: &str, user_id: Option<&str>) -> Result<Vec<Entry>>;
}
