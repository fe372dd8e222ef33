//! # clipvault-index
//!
//! Remote vector index client for clipvault.
//!
//! [`PineconeIndex`] speaks the index data-plane REST dialect (`/vectors/upsert`,
//! `/query`, `/vectors/delete`) with API-key header auth. All three
//! operations are plain request/response: no buffering, no retries, no
//! backoff. [`InMemoryIndex`] is a HashMap-backed stand-in with cosine
//! scoring for tests.

pub mod memory;
pub mod pinecone;

pub use memory::InMemoryIndex;
pub use pinecone::{PineconeConfig, PineconeIndex};
