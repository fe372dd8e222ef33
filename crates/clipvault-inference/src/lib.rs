//! # clipvault-inference
//!
//! Embedding generation for clipvault against a hosted inference endpoint.
//!
//! The [`HuggingFaceBackend`] speaks the hosted Inference API dialect:
//! bearer-token auth, `{"inputs": ..., "options": {"wait_for_model": true}}`
//! requests, and a response that arrives in one of several shapes depending
//! on the model (flat vector, token-level matrix, or wrapped object).
//! Token-level responses are mean-pooled; every vector is L2-normalized
//! before being handed to callers.
//!
//! [`mock::MockEmbeddingBackend`] provides deterministic vectors for tests.

pub mod huggingface;
pub mod mock;

pub use huggingface::{HuggingFaceBackend, HuggingFaceConfig};
pub use mock::MockEmbeddingBackend;
