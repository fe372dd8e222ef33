//! Message-passing surface spoken by the capture clients.
//!
//! Requests arrive as JSON objects tagged by a SCREAMING_SNAKE `type`
//! field; every request is answered with a success/failure envelope.
//! [`dispatch`] never returns an error: failures fold into the envelope
//! with a human-readable message, and read-only listing requests degrade
//! to empty collections so a briefly unavailable store never breaks the
//! listing UI.

use serde::{Deserialize, Serialize};
use tracing::warn;

use clipvault_core::{defaults, CaptureContext, Entry, Error, PageContext, SearchMatch};

use crate::service::KnowledgeService;

/// A request from a capture client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    #[serde(rename = "GET_ALL_ENTRIES")]
    GetAllEntries,

    #[serde(rename = "GET_RECENT_ENTRIES", rename_all = "camelCase")]
    GetRecentEntries {
        #[serde(default)]
        limit: Option<usize>,
    },

    #[serde(rename = "SEARCH_KNOWLEDGE_BASE", rename_all = "camelCase")]
    SearchKnowledgeBase { query: String },

    #[serde(rename = "DELETE_ENTRY", rename_all = "camelCase")]
    DeleteEntry { entry_id: String },

    #[serde(rename = "CATEGORIZE_ENTRY", rename_all = "camelCase")]
    CategorizeEntry { entry_id: String, category: String },

    #[serde(rename = "SAVE_HIGHLIGHTED_TEXT", rename_all = "camelCase")]
    SaveHighlightedText {
        text: String,
        #[serde(default)]
        page_context: PageContext,
        #[serde(default)]
        url: String,
        #[serde(default)]
        title: String,
    },

    #[serde(rename = "SAVE_IMAGE", rename_all = "camelCase")]
    SaveImage {
        image_url: String,
        #[serde(default)]
        alt_text: String,
        #[serde(default)]
        page_context: PageContext,
        #[serde(default)]
        url: String,
        #[serde(default)]
        title: String,
    },
}

/// Success/failure envelope answered to every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<Entry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<SearchMatch>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    fn ok() -> Self {
        Self {
            success: true,
            id: None,
            entries: None,
            results: None,
            error: None,
        }
    }

    fn with_id(id: String) -> Self {
        Self {
            id: Some(id),
            ..Self::ok()
        }
    }

    fn with_entries(entries: Vec<Entry>) -> Self {
        Self {
            entries: Some(entries),
            ..Self::ok()
        }
    }

    fn with_results(results: Vec<SearchMatch>) -> Self {
        Self {
            results: Some(results),
            ..Self::ok()
        }
    }

    fn failure(error: &Error) -> Self {
        Self {
            success: false,
            id: None,
            entries: None,
            results: None,
            error: Some(error.user_message()),
        }
    }

    /// Failure shape for search: clients always receive a results array.
    fn search_failure(error: &Error) -> Self {
        Self {
            results: Some(Vec::new()),
            ..Self::failure(error)
        }
    }

    /// Failure for an unparsable request.
    pub fn unrecognized() -> Self {
        Self {
            success: false,
            id: None,
            entries: None,
            results: None,
            error: Some("Unknown message type".to_string()),
        }
    }
}

/// Answer one request. Infallible by design: the envelope carries the
/// outcome.
pub async fn dispatch(service: &KnowledgeService, request: Request) -> Response {
    match request {
        Request::GetAllEntries => match service.get_all().await {
            Ok(entries) => Response::with_entries(entries),
            Err(e) => {
                warn!(error = %e, "get_all failed, serving empty listing");
                Response::with_entries(Vec::new())
            }
        },

        Request::GetRecentEntries { limit } => {
            let limit = limit.unwrap_or(defaults::RECENT_LIMIT);
            match service.get_recent(limit).await {
                Ok(entries) => Response::with_entries(entries),
                Err(e) => {
                    warn!(error = %e, "get_recent failed, serving empty listing");
                    Response::with_entries(Vec::new())
                }
            }
        }

        Request::SearchKnowledgeBase { query } => match service.search_default(&query).await {
            Ok(results) => Response::with_results(results),
            Err(e) => {
                warn!(error = %e, "search failed");
                Response::search_failure(&e)
            }
        },

        Request::DeleteEntry { entry_id } => match service.delete_entry(&entry_id).await {
            Ok(()) => Response::ok(),
            Err(e) => {
                warn!(entry_id = %entry_id, error = %e, "delete failed");
                Response::failure(&e)
            }
        },

        Request::CategorizeEntry { entry_id, category } => {
            match service.categorize(&entry_id, &category).await {
                Ok(()) => Response::ok(),
                Err(e) => {
                    warn!(entry_id = %entry_id, error = %e, "categorize failed");
                    Response::failure(&e)
                }
            }
        }

        Request::SaveHighlightedText {
            text,
            page_context,
            url,
            title,
        } => {
            let ctx = CaptureContext {
                url,
                title,
                alt_text: String::new(),
                page_context,
            };
            match service.save_text(&text, &ctx).await {
                Ok(entry) => Response::with_id(entry.id),
                Err(e) => {
                    warn!(error = %e, "save_text failed");
                    Response::failure(&e)
                }
            }
        }

        Request::SaveImage {
            image_url,
            alt_text,
            page_context,
            url,
            title,
        } => {
            let ctx = CaptureContext {
                url,
                title,
                alt_text,
                page_context,
            };
            match service.save_image(&image_url, &ctx).await {
                Ok(entry) => Response::with_id(entry.id),
                Err(e) => {
                    warn!(error = %e, "save_image failed");
                    Response::failure(&e)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_tags() {
        let request: Request = serde_json::from_str(
            r#"{"type": "SEARCH_KNOWLEDGE_BASE", "query": "rust borrow checker"}"#,
        )
        .unwrap();
        assert!(matches!(
            request,
            Request::SearchKnowledgeBase { ref query } if query == "rust borrow checker"
        ));
    }

    #[test]
    fn test_request_fields_are_camel_case() {
        let request: Request = serde_json::from_str(
            r#"{"type": "CATEGORIZE_ENTRY", "entryId": "text_1_a", "category": "papers"}"#,
        )
        .unwrap();
        assert!(matches!(
            request,
            Request::CategorizeEntry { ref entry_id, .. } if entry_id == "text_1_a"
        ));
    }

    #[test]
    fn test_save_text_request_with_page_context() {
        let request: Request = serde_json::from_str(
            r#"{
                "type": "SAVE_HIGHLIGHTED_TEXT",
                "text": "captured",
                "url": "https://example.com",
                "title": "Example",
                "pageContext": {"nearbyHeadings": ["Intro"]}
            }"#,
        )
        .unwrap();
        match request {
            Request::SaveHighlightedText { page_context, .. } => {
                assert_eq!(page_context.nearby_headings, vec!["Intro"]);
            }
            other => panic!("unexpected request: {:?}", other),
        }
    }

    #[test]
    fn test_recent_entries_limit_is_optional() {
        let request: Request =
            serde_json::from_str(r#"{"type": "GET_RECENT_ENTRIES"}"#).unwrap();
        assert!(matches!(
            request,
            Request::GetRecentEntries { limit: None }
        ));
    }

    #[test]
    fn test_failure_envelope_shape() {
        let response = Response::failure(&Error::InvalidInput("empty".to_string()));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "No content to save");
        assert!(json.get("entries").is_none());
    }

    #[test]
    fn test_search_failure_keeps_results_array() {
        let response = Response::search_failure(&Error::Remote {
            status: 500,
            body: String::new(),
        });
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert!(json["results"].as_array().unwrap().is_empty());
    }
}
