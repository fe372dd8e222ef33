//! End-to-end tests for the knowledge service over mock remote backends
//! and a real on-disk store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use clipvault_core::{
    CaptureContext, Entry, EntryStore, EntryType, Error, PageContext, Result, VectorIndex,
    VectorMetadata, VectorRecord,
};
use clipvault_index::InMemoryIndex;
use clipvault_inference::MockEmbeddingBackend;
use clipvault_service::{
    dispatch, ClientFactory, Clients, KnowledgeService, Request, StaticClientFactory,
};
use clipvault_store::{FileEntryStore, PendingKind, WriteJournal};

struct Harness {
    _dir: tempfile::TempDir,
    service: Arc<KnowledgeService>,
    embedder: MockEmbeddingBackend,
    index: InMemoryIndex,
    factory: StaticClientFactory,
    store: Arc<FileEntryStore>,
    journal: Arc<WriteJournal>,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let embedder = MockEmbeddingBackend::new(16);
    let index = InMemoryIndex::new();
    let store = Arc::new(FileEntryStore::new(dir.path()));
    let journal = Arc::new(WriteJournal::new(dir.path()));
    let factory = StaticClientFactory::new(Arc::new(embedder.clone()), Arc::new(index.clone()));
    let service = Arc::new(KnowledgeService::new(
        factory.clone(),
        store.clone(),
        journal.clone(),
    ));
    Harness {
        _dir: dir,
        service,
        embedder,
        index,
        factory,
        store,
        journal,
    }
}

fn capture_ctx() -> CaptureContext {
    CaptureContext {
        url: "https://example.com/article".to_string(),
        title: "Deep Dive".to_string(),
        alt_text: String::new(),
        page_context: PageContext {
            selected_text: "the captured sentence".to_string(),
            nearby_text: "context around the captured sentence".to_string(),
            meta_description: "an article".to_string(),
            nearby_headings: vec!["Background".to_string(), "Method".to_string()],
        },
    }
}

// =============================================================================
// Save paths
// =============================================================================

#[tokio::test]
async fn test_save_text_writes_both_stores_under_one_id() {
    let h = harness();

    let entry = h
        .service
        .save_text("the captured sentence", &capture_ctx())
        .await
        .expect("save should succeed");

    assert!(entry.id.starts_with("text_"), "id: {}", entry.id);
    assert_eq!(entry.ai_id.as_deref(), Some(entry.id.as_str()));

    // Remote vector under the same id, with metadata.
    let record = h.index.get(&entry.id).expect("vector should be stored");
    assert_eq!(record.metadata.title, "Deep Dive");
    assert_eq!(record.values.len(), 16);

    // Local mirror holds the full entry.
    let all = h.service.get_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].content.as_deref(), Some("the captured sentence"));
    assert_eq!(all[0].url, "https://example.com/article");

    // Nothing left in flight.
    assert!(h.journal.pending().await.is_empty());
}

#[tokio::test]
async fn test_save_text_rejects_empty_text() {
    let h = harness();
    for text in ["", "   ", "\n\t"] {
        let err = h.service.save_text(text, &capture_ctx()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)), "text: {:?}", text);
    }
    assert!(h.index.is_empty());
    assert!(h.service.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_remote_metadata_is_truncated_local_copy_is_not() {
    let h = harness();
    let long_text = "x".repeat(2_000);
    let mut ctx = capture_ctx();
    ctx.page_context.nearby_headings = (0..30).map(|i| format!("H{}", i)).collect();

    let entry = h.service.save_text(&long_text, &ctx).await.unwrap();

    let record = h.index.get(&entry.id).unwrap();
    assert_eq!(record.metadata.content.as_ref().unwrap().len(), 500);
    assert_eq!(record.metadata.headings.len(), 15);

    let all = h.service.get_all().await.unwrap();
    assert_eq!(all[0].content.as_ref().unwrap().len(), 2_000);
    assert_eq!(all[0].page_context.nearby_headings.len(), 30);
}

#[tokio::test]
async fn test_save_image_embeds_text_signals() {
    let h = harness();
    let mut ctx = capture_ctx();
    ctx.alt_text = "diagram of the pipeline".to_string();

    let entry = h
        .service
        .save_image("https://example.com/fig1.png", &ctx)
        .await
        .expect("save should succeed");

    assert!(entry.id.starts_with("image_"));
    assert_eq!(entry.entry_type, EntryType::Image);
    assert_eq!(entry.alt_text.as_deref(), Some("diagram of the pipeline"));

    let record = h.index.get(&entry.id).unwrap();
    assert_eq!(record.metadata.alt.as_deref(), Some("diagram of the pipeline"));
    // The vector comes from alt + title + headings, never image bytes.
    let expected = h
        .embedder
        .vector_for("diagram of the pipeline Deep Dive Background Method");
    assert_eq!(record.values, expected);
}

#[tokio::test]
async fn test_save_image_rejects_empty_url() {
    let h = harness();
    let err = h.service.save_image("", &capture_ctx()).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn test_resaving_same_content_creates_new_entry() {
    let h = harness();
    let a = h.service.save_text("same words", &capture_ctx()).await.unwrap();
    let b = h.service.save_text("same words", &capture_ctx()).await.unwrap();
    assert_ne!(a.id, b.id);
    assert_eq!(h.index.len(), 2);
    assert_eq!(h.service.get_all().await.unwrap().len(), 2);
}

// =============================================================================
// Failure propagation
// =============================================================================

#[tokio::test]
async fn test_search_degrades_but_save_propagates_on_index_failure() {
    let h = harness();
    h.service.save_text("existing entry", &capture_ctx()).await.unwrap();

    h.index.set_failing(true);

    // Search swallows the index failure into "no results".
    let matches = h.service.search("anything", 10).await.unwrap();
    assert!(matches.is_empty());

    // The write path must not pretend success.
    let err = h
        .service
        .save_text("new entry", &capture_ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Remote { .. }));
}

#[tokio::test]
async fn test_embedding_failure_propagates_everywhere() {
    let h = harness();
    // Initialize first so the failure hits the embed call, not the probe.
    h.service.save_text("warmup", &capture_ctx()).await.unwrap();

    h.embedder.set_failing(true);

    let err = h.service.search("query", 10).await.unwrap_err();
    assert!(matches!(err, Error::Remote { .. }));

    let err = h
        .service
        .save_text("more text", &capture_ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Remote { .. }));
}

#[tokio::test]
async fn test_failed_upsert_leaves_journal_intent_for_repair() {
    let h = harness();
    h.service.save_text("warmup", &capture_ctx()).await.unwrap();
    h.index.set_failing(true);

    let err = h.service.save_text("lost capture", &capture_ctx()).await;
    assert!(err.is_err());

    // The intent survives for startup reconciliation.
    let pending = h.journal.pending().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].kind, PendingKind::Save);

    // Replay: no local copy was written, so the (possibly orphaned)
    // remote vector is deleted and the intent cleared.
    h.index.set_failing(false);
    let report = h.service.reconcile().await.unwrap();
    assert_eq!(report.abandoned_saves, 1);
    assert!(h.journal.pending().await.is_empty());
}

// =============================================================================
// Search
// =============================================================================

#[tokio::test]
async fn test_search_returns_canonical_matches() {
    let h = harness();
    let saved = h
        .service
        .save_text("rust ownership rules", &capture_ctx())
        .await
        .unwrap();

    let matches = h.service.search("rust ownership", 10).await.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].id, saved.id);
    assert_eq!(matches[0].metadata.title, "Deep Dive");
    assert_eq!(matches[0].metadata.entry_type, EntryType::Text);
}

#[tokio::test]
async fn test_search_empty_index_returns_empty() {
    let h = harness();
    let matches = h.service.search_default("anything").await.unwrap();
    assert!(matches.is_empty());
}

// =============================================================================
// Delete
// =============================================================================

#[tokio::test]
async fn test_delete_entry_removes_both_copies() {
    let h = harness();
    let entry = h.service.save_text("to be removed", &capture_ctx()).await.unwrap();
    let keeper = h.service.save_text("to be kept", &capture_ctx()).await.unwrap();

    h.service.delete_entry(&entry.id).await.unwrap();

    assert!(!h.index.contains(&entry.id));
    assert!(h.index.contains(&keeper.id));
    let all = h.service.get_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, keeper.id);
    assert!(h.journal.pending().await.is_empty());
}

#[tokio::test]
async fn test_delete_unknown_id_is_noop() {
    let h = harness();
    h.service.save_text("survivor", &capture_ctx()).await.unwrap();
    h.service.delete_entry("text_0_missing").await.unwrap();
    assert_eq!(h.service.get_all().await.unwrap().len(), 1);
}

// =============================================================================
// Local operations
// =============================================================================

#[tokio::test]
async fn test_get_recent_orders_newest_first() {
    let h = harness();
    let first = h.service.save_text("first", &capture_ctx()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = h.service.save_text("second", &capture_ctx()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let third = h.service.save_text("third", &capture_ctx()).await.unwrap();

    let recent = h.service.get_recent(2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].id, third.id);
    assert_eq!(recent[1].id, second.id);
    assert!(recent.iter().all(|e| e.id != first.id));
}

#[tokio::test]
async fn test_get_all_is_scoped_to_this_installation() {
    let h = harness();
    h.service.save_text("mine", &capture_ctx()).await.unwrap();

    // An entry written by another installation sharing the snapshot.
    let foreign = Entry {
        id: "text_0_foreign".to_string(),
        user_id: Some("user_0_other".to_string()),
        entry_type: EntryType::Text,
        content: Some("not mine".to_string()),
        image_url: None,
        alt_text: None,
        url: String::new(),
        title: String::new(),
        page_context: PageContext::default(),
        category: String::new(),
        timestamp: Utc::now(),
        ai_id: None,
    };
    h.store.save(foreign).await.unwrap();

    let mine = h.service.get_all().await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].content.as_deref(), Some("mine"));

    // The unscoped store view still sees both.
    assert_eq!(h.store.get_all(None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_categorize_and_local_search() {
    let h = harness();
    let entry = h.service.save_text("borrow checker notes", &capture_ctx()).await.unwrap();
    h.service.categorize(&entry.id, "rust").await.unwrap();

    let hits = h.service.search_local("BORROW").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].category, "rust");

    // Category text is searchable too.
    let hits = h.service.search_local("rust").await.unwrap();
    assert_eq!(hits.len(), 1);
}

// =============================================================================
// Initialization state machine
// =============================================================================

#[tokio::test]
async fn test_failed_initialization_is_retryable() {
    let h = harness();
    h.factory.set_failure(Some("keys missing")).await;

    let err = h.service.save_text("text", &capture_ctx()).await.unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert_eq!(h.service.state_name().await, "uninitialized");

    // Credentials fixed; the next operation initializes and succeeds.
    h.factory.set_failure(None).await;
    h.service.save_text("text", &capture_ctx()).await.unwrap();
    assert_eq!(h.service.state_name().await, "ready");
}

struct CountingFactory {
    inner: StaticClientFactory,
    builds: Arc<AtomicUsize>,
}

#[async_trait]
impl ClientFactory for CountingFactory {
    async fn build(&self) -> Result<Clients> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        // Widen the race window so concurrent callers overlap the build.
        tokio::time::sleep(Duration::from_millis(25)).await;
        self.inner.build().await
    }
}

#[tokio::test]
async fn test_concurrent_first_operations_initialize_once() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = MockEmbeddingBackend::new(16);
    let index = InMemoryIndex::new();
    let builds = Arc::new(AtomicUsize::new(0));
    let factory = CountingFactory {
        inner: StaticClientFactory::new(Arc::new(embedder), Arc::new(index.clone())),
        builds: builds.clone(),
    };
    let service = Arc::new(KnowledgeService::new(
        factory,
        Arc::new(FileEntryStore::new(dir.path())),
        Arc::new(WriteJournal::new(dir.path())),
    ));

    let mut handles = Vec::new();
    for i in 0..4 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .save_text(&format!("capture {}", i), &CaptureContext::default())
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert_eq!(index.len(), 4);
}

// =============================================================================
// Reconciliation
// =============================================================================

#[tokio::test]
async fn test_reconcile_clean_journal_touches_nothing() {
    let h = harness();
    h.factory.set_failure(Some("keys missing")).await;
    // Empty journal: no remote clients needed, no error even though the
    // factory would fail.
    let report = h.service.reconcile().await.unwrap();
    assert!(report.is_clean());
    assert_eq!(h.service.state_name().await, "uninitialized");
}

#[tokio::test]
async fn test_reconcile_replays_save_from_local_copy() {
    let h = harness();

    // Local mirror written, remote upsert lost (crash before it landed
    // or after a failed request), intent still journaled.
    let entry = Entry {
        id: "text_42_replayme".to_string(),
        user_id: Some("user_42_aaaaaaa".to_string()),
        entry_type: EntryType::Text,
        content: Some("survived locally".to_string()),
        image_url: None,
        alt_text: None,
        url: "https://example.com".to_string(),
        title: "Recovered".to_string(),
        page_context: PageContext::default(),
        category: String::new(),
        timestamp: Utc::now(),
        ai_id: Some("text_42_replayme".to_string()),
    };
    h.store.save(entry).await.unwrap();
    h.journal.record("text_42_replayme", PendingKind::Save).await.unwrap();

    let report = h.service.reconcile().await.unwrap();
    assert_eq!(report.replayed_saves, 1);
    assert_eq!(report.failed, 0);

    let record = h.index.get("text_42_replayme").expect("vector restored");
    assert_eq!(record.metadata.title, "Recovered");
    assert!(h.journal.pending().await.is_empty());
}

#[tokio::test]
async fn test_reconcile_deletes_orphaned_remote_vector() {
    let h = harness();

    // Remote vector landed but the local mirror write never happened.
    h.index
        .upsert(&[VectorRecord {
            id: "text_7_orphan".to_string(),
            values: vec![1.0; 16],
            metadata: VectorMetadata::default(),
        }])
        .await
        .unwrap();
    h.journal.record("text_7_orphan", PendingKind::Save).await.unwrap();

    let report = h.service.reconcile().await.unwrap();
    assert_eq!(report.abandoned_saves, 1);
    assert!(!h.index.contains("text_7_orphan"));
    assert!(h.journal.pending().await.is_empty());
}

#[tokio::test]
async fn test_reconcile_reissues_pending_delete() {
    let h = harness();
    let entry = h.service.save_text("doomed", &capture_ctx()).await.unwrap();

    // Simulate a crash mid-delete: intent recorded, nothing removed yet.
    h.journal.record(&entry.id, PendingKind::Delete).await.unwrap();

    let report = h.service.reconcile().await.unwrap();
    assert_eq!(report.replayed_deletes, 1);
    assert!(!h.index.contains(&entry.id));
    assert!(h.service.get_all().await.unwrap().is_empty());
    assert!(h.journal.pending().await.is_empty());
}

#[tokio::test]
async fn test_reconcile_keeps_record_when_replay_fails() {
    let h = harness();
    let entry = h.service.save_text("stuck", &capture_ctx()).await.unwrap();
    h.journal.record(&entry.id, PendingKind::Delete).await.unwrap();

    h.index.set_failing(true);
    let report = h.service.reconcile().await.unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(h.journal.pending().await.len(), 1);

    // Next launch, the index is back.
    h.index.set_failing(false);
    let report = h.service.reconcile().await.unwrap();
    assert_eq!(report.replayed_deletes, 1);
    assert!(h.journal.pending().await.is_empty());
}

// =============================================================================
// Message surface
// =============================================================================

#[tokio::test]
async fn test_dispatch_save_and_list_round_trip() {
    let h = harness();

    let response = dispatch(
        &h.service,
        Request::SaveHighlightedText {
            text: "captured via message".to_string(),
            page_context: PageContext::default(),
            url: "https://example.com".to_string(),
            title: "Example".to_string(),
        },
    )
    .await;
    assert!(response.success);
    let id = response.id.expect("save response carries the id");

    let response = dispatch(&h.service, Request::GetAllEntries).await;
    assert!(response.success);
    let entries = response.entries.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, id);

    let response = dispatch(&h.service, Request::DeleteEntry { entry_id: id }).await;
    assert!(response.success);
    let response = dispatch(&h.service, Request::GetAllEntries).await;
    assert!(response.entries.unwrap().is_empty());
}

#[tokio::test]
async fn test_dispatch_folds_validation_error_into_envelope() {
    let h = harness();
    let response = dispatch(
        &h.service,
        Request::SaveHighlightedText {
            text: "   ".to_string(),
            page_context: PageContext::default(),
            url: String::new(),
            title: String::new(),
        },
    )
    .await;
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("No content to save"));
}

#[tokio::test]
async fn test_dispatch_search_failure_keeps_results_array() {
    let h = harness();
    h.service.save_text("warmup", &capture_ctx()).await.unwrap();
    h.embedder.set_failing(true);

    let response = dispatch(
        &h.service,
        Request::SearchKnowledgeBase {
            query: "anything".to_string(),
        },
    )
    .await;
    assert!(!response.success);
    assert!(response.results.unwrap().is_empty());
    assert!(response.error.is_some());
}

#[tokio::test]
async fn test_dispatch_recent_uses_default_limit() {
    let h = harness();
    for i in 0..12 {
        h.service
            .save_text(&format!("entry {}", i), &capture_ctx())
            .await
            .unwrap();
    }
    let response = dispatch(&h.service, Request::GetRecentEntries { limit: None }).await;
    assert_eq!(response.entries.unwrap().len(), 10);

    let response = dispatch(&h.service, Request::GetRecentEntries { limit: Some(3) }).await;
    assert_eq!(response.entries.unwrap().len(), 3);
}
