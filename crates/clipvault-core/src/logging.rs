//! Structured logging field name constants for clipvault.
//!
//! All crates use these constants for consistent structured logging fields
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "inference", "index", "store", "service"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "huggingface", "pinecone", "file_store", "reconcile"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "embed", "upsert", "query", "save_text"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Entry id being operated on.
pub const ENTRY_ID: &str = "entry_id";

/// Search query text.
pub const QUERY: &str = "query";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a search or query.
pub const RESULT_COUNT: &str = "result_count";

/// Byte length of an embedding input.
pub const INPUT_LEN: &str = "input_len";

/// Embedding requests slower than this are logged with `slow = true`.
pub const SLOW_EMBED_MS: u64 = 5_000;
