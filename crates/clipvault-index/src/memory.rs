//! In-memory vector index for deterministic testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use clipvault_core::{
    cosine_similarity, Error, Result, SearchMatch, VectorIndex, VectorMetadata, VectorRecord,
};

/// HashMap-backed [`VectorIndex`] with cosine scoring.
///
/// Mirrors the remote index contract: upsert replaces whole records,
/// queries on an empty index return an empty list, deleting unknown ids
/// is a no-op. Failure injection covers the degrade-to-empty and
/// error-propagation paths in service tests.
#[derive(Clone, Default)]
pub struct InMemoryIndex {
    records: Arc<Mutex<HashMap<String, VectorRecord>>>,
    failing: Arc<AtomicBool>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.records.lock().expect("index lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a record with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.records
            .lock()
            .expect("index lock poisoned")
            .contains_key(id)
    }

    /// Fetch a stored record by id, for assertions.
    pub fn get(&self, id: &str) -> Option<VectorRecord> {
        self.records
            .lock()
            .expect("index lock poisoned")
            .get(id)
            .cloned()
    }

    fn fail_if_injected(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Remote {
                status: 500,
                body: "mock index failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        self.fail_if_injected()?;
        let mut map = self.records.lock().expect("index lock poisoned");
        for record in records {
            map.insert(record.id.clone(), record.clone());
        }
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<SearchMatch>> {
        self.fail_if_injected()?;
        let map = self.records.lock().expect("index lock poisoned");
        let mut matches: Vec<SearchMatch> = map
            .values()
            .map(|record| SearchMatch {
                id: record.id.clone(),
                score: cosine_similarity(vector, &record.values),
                metadata: if include_metadata {
                    record.metadata.clone()
                } else {
                    VectorMetadata::default()
                },
            })
            .collect();
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        self.fail_if_injected()?;
        let mut map = self.records.lock().expect("index lock poisoned");
        for id in ids {
            map.remove(id);
        }
        Ok(())
    }
}
