//! Centralized default constants for the clipvault system.
//!
//! **This module is the single source of truth** for all shared default
//! values. All crates reference these constants instead of defining their
//! own magic numbers.

// =============================================================================
// EMBEDDING
// =============================================================================

/// Default hosted embedding model.
pub const EMBED_MODEL: &str = "BAAI/bge-large-en-v1.5";

/// Default embedding vector dimension for bge-large-en-v1.5.
pub const EMBED_DIMENSION: usize = 1024;

/// Default base URL for the hosted inference API.
pub const INFERENCE_BASE_URL: &str = "https://api-inference.huggingface.co";

/// Timeout for embedding requests (seconds).
pub const EMBED_TIMEOUT_SECS: u64 = 30;

/// Probe string embedded by health checks.
pub const HEALTH_PROBE: &str = "health check";

// =============================================================================
// VECTOR INDEX
// =============================================================================

/// Data-plane API version header value.
pub const INDEX_API_VERSION: &str = "2025-04";

/// Timeout for index requests (seconds).
pub const INDEX_TIMEOUT_SECS: u64 = 30;

/// Default number of nearest neighbors requested by semantic search.
pub const SEARCH_TOP_K: usize = 20;

// =============================================================================
// REMOTE METADATA CAPS
// =============================================================================
// The index stores a size-constrained, denormalized projection of each
// entry; the local mirror keeps the full content.

/// Maximum characters of captured content stored in index metadata.
pub const METADATA_CONTENT_CHARS: usize = 500;

/// Maximum number of nearby headings stored in index metadata.
pub const METADATA_HEADING_CAP: usize = 15;

/// Maximum characters of surrounding-text snippet stored in index metadata.
pub const METADATA_SNIPPET_CHARS: usize = 500;

// =============================================================================
// LOCAL CACHE
// =============================================================================

/// Default page size for recent-entry listings.
pub const RECENT_LIMIT: usize = 10;

/// Snapshot file name under the store base directory.
pub const STORE_FILE: &str = "entries.json";

/// Pending-write journal file name under the store base directory.
pub const JOURNAL_FILE: &str = "journal.json";

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Minimum plausible API key length; shorter values fail validation.
pub const MIN_API_KEY_LEN: usize = 10;
