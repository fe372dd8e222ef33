//! # clipvault-service
//!
//! Orchestration layer for clipvault: composes the embedding backend, the
//! remote vector index, and the local entry store into the capture
//! operations (save text, save image, semantic search, delete) and the
//! message-passing surface the capture clients speak.
//!
//! The [`KnowledgeService`] is an explicit context object constructed once
//! at process start; remote clients are built lazily by a guarded,
//! at-most-once-in-flight initialization step so the first operation pays
//! the credential validation and health probe, and a failed initialization
//! can be retried later.

pub mod config;
pub mod messages;
pub mod reconcile;
pub mod service;

pub use config::ClipvaultConfig;
pub use messages::{dispatch, Request, Response};
pub use reconcile::ReconcileReport;
pub use service::{Clients, ClientFactory, ConfigClientFactory, KnowledgeService, StaticClientFactory};
