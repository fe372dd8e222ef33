//! Core data models for clipvault.
//!
//! These types are shared across all clipvault crates and represent the
//! captured-knowledge domain entities. Wire-facing types serialize with
//! camelCase keys to stay compatible with the capture clients and the
//! index data plane.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::defaults;

// =============================================================================
// ENTRY TYPES
// =============================================================================

/// Kind of captured content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    #[default]
    Text,
    Image,
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Image => write!(f, "image"),
        }
    }
}

impl EntryType {
    /// Id prefix used for entries of this type.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
        }
    }
}

/// Unstructured page-context bag captured alongside a selection.
///
/// Nothing here is validated; fields enrich the embedding input and feed
/// local substring search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageContext {
    pub selected_text: String,
    pub nearby_text: String,
    pub meta_description: String,
    /// Headings near the capture point. Older capture clients sent this
    /// under `headings`.
    #[serde(alias = "headings")]
    pub nearby_headings: Vec<String>,
}

impl PageContext {
    /// Nearby headings joined with single spaces, for embedding input and
    /// local search.
    pub fn joined_headings(&self) -> String {
        self.nearby_headings.join(" ")
    }

    /// Text surrounding the capture, preferring the wider nearby-text over
    /// the raw selection.
    pub fn snippet_source(&self) -> &str {
        if !self.nearby_text.is_empty() {
            &self.nearby_text
        } else {
            &self.selected_text
        }
    }
}

/// Source-page identity and context delivered with a capture event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureContext {
    pub url: String,
    pub title: String,
    pub alt_text: String,
    pub page_context: PageContext,
}

/// A single saved piece of knowledge.
///
/// The local mirror keeps entries untruncated; only the index metadata
/// projection is size-capped. `id` joins the local copy to the remote
/// vector; `ai_id` records the id the vector was stored under and equals
/// `id` unless the two stores have diverged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: String,
    /// Owning installation. Absent only on entries written before user
    /// scoping existed; a startup migration stamps those.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    /// Raw captured text (text entries).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Source image URL (image entries).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Image alt text (image entries).
    #[serde(default, rename = "alt", skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub page_context: PageContext,
    /// Free-form label, mutable via categorize only.
    #[serde(default)]
    pub category: String,
    /// Creation time; immutable, the sole sort key for recency.
    pub timestamp: DateTime<Utc>,
    /// Id the entry's vector is stored under remotely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_id: Option<String>,
}

impl Entry {
    /// Concatenated text searched by the local substring search.
    pub fn searchable_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(4);
        if let Some(content) = &self.content {
            parts.push(content);
        }
        parts.push(&self.title);
        parts.push(&self.category);
        let headings = self.page_context.joined_headings();
        let mut text = parts.join(" ");
        if !headings.is_empty() {
            text.push(' ');
            text.push_str(&headings);
        }
        text
    }
}

// =============================================================================
// INDEX RECORD TYPES
// =============================================================================

/// Flattened, size-constrained projection of an [`Entry`] stored as index
/// metadata alongside its vector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VectorMetadata {
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    pub url: String,
    pub title: String,
    pub headings: Vec<String>,
    pub meta_description: String,
    pub context_snippet: String,
    pub category: String,
    /// Absent on records written by other tools sharing the index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Owning installation, recorded for forward compatibility; queries do
    /// not filter on it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl VectorMetadata {
    /// Build the index projection of an entry, applying the metadata size
    /// caps. The local mirror is never truncated; this projection is.
    pub fn from_entry(entry: &Entry) -> Self {
        let ctx = &entry.page_context;
        Self {
            entry_type: entry.entry_type,
            content: entry
                .content
                .as_deref()
                .map(|c| truncate_chars(c, defaults::METADATA_CONTENT_CHARS)),
            image_url: entry.image_url.clone(),
            alt: entry.alt_text.clone(),
            url: entry.url.clone(),
            title: entry.title.clone(),
            headings: ctx
                .nearby_headings
                .iter()
                .take(defaults::METADATA_HEADING_CAP)
                .cloned()
                .collect(),
            meta_description: ctx.meta_description.clone(),
            context_snippet: truncate_chars(ctx.snippet_source(), defaults::METADATA_SNIPPET_CHARS),
            category: entry.category.clone(),
            timestamp: Some(entry.timestamp),
            user_id: entry.user_id.clone(),
        }
    }
}

/// A vector with metadata, as upserted into the remote index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: VectorMetadata,
}

/// One nearest-neighbor result from a semantic query.
///
/// Metadata fields missing on the remote record deserialize to their
/// defaults, so every match presents the full canonical shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchMatch {
    pub id: String,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub metadata: VectorMetadata,
}

/// Truncate to at most `max` characters, respecting char boundaries.
fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
