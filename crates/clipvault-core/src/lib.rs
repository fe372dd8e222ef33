//! # clipvault-core
//!
//! Core types, traits, and abstractions for the clipvault capture vault.
//!
//! This crate provides the foundational data structures and trait definitions
//! that other clipvault crates depend on.

pub mod defaults;
pub mod error;
pub mod ids;
pub mod logging;
pub mod models;
pub mod traits;
pub mod vecmath;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use ids::{entry_id, install_id};
pub use models::*;
pub use traits::*;
pub use vecmath::{cosine_similarity, l2_normalize, mean_pool};
