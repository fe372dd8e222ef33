//! Mock embedding backend for deterministic testing.
//!
//! Produces stable pseudo-random vectors derived from the input text, so
//! identical texts embed identically across runs and similar assertions
//! stay reproducible. Failure injection covers the error-propagation
//! paths.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use clipvault_core::{l2_normalize, EmbeddingBackend, Error, Result};

/// Deterministic mock implementation of [`EmbeddingBackend`].
#[derive(Clone)]
pub struct MockEmbeddingBackend {
    dimension: usize,
    failing: Arc<AtomicBool>,
    embed_calls: Arc<AtomicUsize>,
}

impl MockEmbeddingBackend {
    /// Create a mock backend with the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            failing: Arc::new(AtomicBool::new(false)),
            embed_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make every subsequent embed call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of embed calls made so far.
    pub fn embed_call_count(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    /// The deterministic (normalized) vector this backend produces for a
    /// text, for use in assertions.
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut state = fnv1a(text.as_bytes());
        let raw: Vec<f32> = (0..self.dimension)
            .map(|_| {
                state = lcg(state);
                // Map to [-1, 1)
                (state >> 40) as f32 / (1u64 << 23) as f32 - 1.0
            })
            .collect();
        l2_normalize(raw)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = 0xcbf29ce484222325u64;
    for b in bytes {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

fn lcg(state: u64) -> u64 {
    state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407)
}

#[async_trait]
impl EmbeddingBackend for MockEmbeddingBackend {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Remote {
                status: 503,
                body: "mock embedding failure".to_string(),
            });
        }
        Ok(self.vector_for(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "mock-embed"
    }
}
