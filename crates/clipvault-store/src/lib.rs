//! # clipvault-store
//!
//! Durable local mirror of saved entries.
//!
//! Entries live in a single JSON snapshot on disk together with the
//! installation identity and the reserved categories list. All mutations
//! are serialized through one writer lock and written atomically
//! (temp file + rename), so interleaved saves cannot drop each other's
//! appends. Reads are best-effort: a missing or unreadable snapshot
//! degrades to an empty collection so listings stay functional.
//!
//! The [`journal::WriteJournal`] is a durable pending-write log used by
//! the service layer to repair cross-store inconsistency after a crash
//! between the remote and local writes.

pub mod entries;
mod fsio;
pub mod identity;
pub mod journal;

pub use entries::FileEntryStore;
pub use journal::{PendingKind, PendingOp, WriteJournal};
