//! Knowledge entry service.
//!
//! Orchestrates capture → embed → persist (remote index + local mirror)
//! and query → embed → search (remote only). The service is an explicit
//! context object: every dependency is injected, and the remote clients
//! are built by a guarded lazy initialization so missing credentials
//! surface as a configuration error on first use rather than at
//! construction.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, instrument, warn};

use clipvault_core::{
    defaults, entry_id, CaptureContext, EmbeddingBackend, Entry, EntryStore, EntryType, Error,
    Result, SearchMatch, VectorIndex, VectorMetadata, VectorRecord,
};
use clipvault_index::PineconeIndex;
use clipvault_inference::HuggingFaceBackend;
use clipvault_store::{FileEntryStore, PendingKind, WriteJournal};

use crate::config::ClipvaultConfig;

/// Remote clients produced by initialization.
#[derive(Clone)]
pub struct Clients {
    pub embedder: Arc<dyn EmbeddingBackend>,
    pub index: Arc<dyn VectorIndex>,
}

/// Builds the remote clients during initialization.
///
/// The production factory validates credentials and constructs HTTP
/// clients; tests inject pre-built mocks through
/// [`StaticClientFactory`].
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn build(&self) -> Result<Clients>;
}

/// Factory building clients from a [`ClipvaultConfig`].
pub struct ConfigClientFactory {
    config: ClipvaultConfig,
}

impl ConfigClientFactory {
    pub fn new(config: ClipvaultConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ClientFactory for ConfigClientFactory {
    async fn build(&self) -> Result<Clients> {
        self.config.validate()?;
        let embedder = HuggingFaceBackend::new(self.config.inference_config())?;
        let index = PineconeIndex::new(self.config.index_config())?;
        Ok(Clients {
            embedder: Arc::new(embedder),
            index: Arc::new(index),
        })
    }
}

/// Factory handing out pre-built clients, optionally failing to
/// exercise the configuration-error path. Clones share the failure
/// switch, so a test can keep a handle after the service takes the
/// factory.
#[derive(Clone)]
pub struct StaticClientFactory {
    clients: Clients,
    fail_with: Arc<Mutex<Option<String>>>,
}

impl StaticClientFactory {
    pub fn new(embedder: Arc<dyn EmbeddingBackend>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            clients: Clients { embedder, index },
            fail_with: Arc::new(Mutex::new(None)),
        }
    }

    /// Make subsequent builds fail with a configuration error.
    pub async fn set_failure(&self, message: Option<&str>) {
        *self.fail_with.lock().await = message.map(str::to_string);
    }
}

#[async_trait]
impl ClientFactory for StaticClientFactory {
    async fn build(&self) -> Result<Clients> {
        if let Some(message) = self.fail_with.lock().await.clone() {
            return Err(Error::Config(message));
        }
        Ok(self.clients.clone())
    }
}

/// Initialization state. `Initializing` carries the completion signal a
/// concurrent caller waits on instead of starting a second build.
enum ServiceState {
    Uninitialized,
    Initializing(watch::Receiver<bool>),
    Ready(Clients),
}

/// The capture orchestration service.
pub struct KnowledgeService {
    factory: Box<dyn ClientFactory>,
    store: Arc<FileEntryStore>,
    journal: Arc<WriteJournal>,
    state: Mutex<ServiceState>,
}

impl KnowledgeService {
    /// Create a service over injected dependencies. No remote traffic
    /// happens until the first operation.
    pub fn new(
        factory: impl ClientFactory + 'static,
        store: Arc<FileEntryStore>,
        journal: Arc<WriteJournal>,
    ) -> Self {
        Self {
            factory: Box::new(factory),
            store,
            journal,
            state: Mutex::new(ServiceState::Uninitialized),
        }
    }

    /// Create a service from configuration, rooting the local store and
    /// journal in the configured data directory.
    pub fn from_config(config: ClipvaultConfig) -> Self {
        let data_dir = config.store.resolved_data_dir();
        let store = Arc::new(FileEntryStore::new(&data_dir));
        let journal = Arc::new(WriteJournal::new(&data_dir));
        Self::new(ConfigClientFactory::new(config), store, journal)
    }

    /// The local entry store backing this service.
    pub fn store(&self) -> &Arc<FileEntryStore> {
        &self.store
    }

    /// The pending-write journal backing this service.
    pub fn journal(&self) -> &Arc<WriteJournal> {
        &self.journal
    }

    /// Current initialization state, for observability.
    pub async fn state_name(&self) -> &'static str {
        match &*self.state.lock().await {
            ServiceState::Uninitialized => "uninitialized",
            ServiceState::Initializing(_) => "initializing",
            ServiceState::Ready(_) => "ready",
        }
    }

    /// Return the remote clients, running the at-most-once-in-flight
    /// initialization if needed.
    ///
    /// Exactly one caller builds; concurrent callers await its completion
    /// signal and then re-check the state. A failed build leaves the
    /// service `Uninitialized` so a later call retries.
    pub(crate) async fn ensure_ready(&self) -> Result<Clients> {
        loop {
            let mut rx = {
                let mut state = self.state.lock().await;
                match &*state {
                    ServiceState::Ready(clients) => return Ok(clients.clone()),
                    ServiceState::Initializing(rx) => rx.clone(),
                    ServiceState::Uninitialized => {
                        let (tx, rx) = watch::channel(false);
                        *state = ServiceState::Initializing(rx);
                        drop(state);

                        let result = self.initialize().await;

                        let mut state = self.state.lock().await;
                        let outcome = match result {
                            Ok(clients) => {
                                *state = ServiceState::Ready(clients.clone());
                                Ok(clients)
                            }
                            Err(e) => {
                                *state = ServiceState::Uninitialized;
                                Err(e)
                            }
                        };
                        drop(state);
                        let _ = tx.send(true);
                        return outcome;
                    }
                }
            };

            let already_done = *rx.borrow();
            if !already_done && rx.changed().await.is_err() {
                // The initializing task was dropped before completing;
                // reset so somebody (possibly us, next iteration) retries.
                let mut state = self.state.lock().await;
                if matches!(&*state, ServiceState::Initializing(_)) {
                    *state = ServiceState::Uninitialized;
                }
            }
        }
    }

    async fn initialize(&self) -> Result<Clients> {
        info!(subsystem = "service", op = "initialize", "Initializing knowledge service");
        let clients = self.factory.build().await?;
        // Reachability is probed but not required; captures made while
        // the model spins up fail individually with a clearer error.
        if !clients.embedder.health_check().await {
            warn!("embedding endpoint unreachable at initialization");
        }
        info!("Knowledge service initialized");
        Ok(clients)
    }

    // ========================================================================
    // Capture operations
    // ========================================================================

    /// Save captured text. Errors propagate; the caller owns user-visible
    /// notification.
    #[instrument(skip(self, text, ctx), fields(subsystem = "service", op = "save_text", input_len = text.len()))]
    pub async fn save_text(&self, text: &str, ctx: &CaptureContext) -> Result<Entry> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("no text provided".to_string()));
        }
        let entry = self
            .build_entry(EntryType::Text, Some(text.to_string()), None, ctx)
            .await?;
        self.persist_entry(entry).await
    }

    /// Save a captured image. Only the text signals (alt text, title,
    /// headings) are embedded, never the image bytes.
    #[instrument(skip(self, image_url, ctx), fields(subsystem = "service", op = "save_image"))]
    pub async fn save_image(&self, image_url: &str, ctx: &CaptureContext) -> Result<Entry> {
        if image_url.trim().is_empty() {
            return Err(Error::InvalidInput("no image provided".to_string()));
        }
        let entry = self
            .build_entry(EntryType::Image, None, Some(image_url.to_string()), ctx)
            .await?;
        self.persist_entry(entry).await
    }

    /// Semantic search over the remote index.
    ///
    /// Embedding failures propagate (there is no search without a query
    /// vector); an index failure degrades to an empty result list so a
    /// missing remote index never blocks the UI.
    #[instrument(skip(self), fields(subsystem = "service", op = "search", query, top_k))]
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchMatch>> {
        let clients = self.ensure_ready().await?;
        let vector = clients.embedder.embed(query).await?;

        match clients.index.query(&vector, top_k, true).await {
            Ok(matches) => {
                debug!(result_count = matches.len(), "search complete");
                Ok(matches)
            }
            Err(e) => {
                warn!(error = %e, "index query failed, returning empty matches");
                Ok(Vec::new())
            }
        }
    }

    /// Semantic search with the default result count.
    pub async fn search_default(&self, query: &str) -> Result<Vec<SearchMatch>> {
        self.search(query, defaults::SEARCH_TOP_K).await
    }

    /// Delete an entry everywhere: remote vector first, then the local
    /// mirror. One call removes both copies.
    #[instrument(skip(self), fields(subsystem = "service", op = "delete_entry", entry_id = id))]
    pub async fn delete_entry(&self, id: &str) -> Result<()> {
        let clients = self.ensure_ready().await?;

        self.journal.record(id, PendingKind::Delete).await?;
        clients.index.delete(&[id.to_string()]).await?;
        if let Err(e) = self.store.delete(id).await {
            error!(
                entry_id = id,
                error = %e,
                "partial failure: vector deleted remotely but local mirror removal failed"
            );
            return Err(e);
        }
        self.journal.clear(id).await?;
        info!(entry_id = id, "entry deleted");
        Ok(())
    }

    // ========================================================================
    // Local-only operations (no remote traffic)
    // ========================================================================

    /// All entries for this installation.
    pub async fn get_all(&self) -> Result<Vec<Entry>> {
        let user_id = self.store.user_id().await?;
        self.store.get_all(Some(&user_id)).await
    }

    /// Most recent entries for this installation, newest first.
    pub async fn get_recent(&self, limit: usize) -> Result<Vec<Entry>> {
        let user_id = self.store.user_id().await?;
        self.store.get_recent(limit, Some(&user_id)).await
    }

    /// Set an entry's category.
    pub async fn categorize(&self, id: &str, category: &str) -> Result<()> {
        self.store.categorize(id, category).await
    }

    /// Case-insensitive substring search over the local mirror.
    pub async fn search_local(&self, query: &str) -> Result<Vec<Entry>> {
        let user_id = self.store.user_id().await?;
        self.store.search_local(query, Some(&user_id)).await
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn build_entry(
        &self,
        entry_type: EntryType,
        content: Option<String>,
        image_url: Option<String>,
        ctx: &CaptureContext,
    ) -> Result<Entry> {
        let user_id = self.store.user_id().await?;
        let id = entry_id(entry_type.id_prefix());
        Ok(Entry {
            ai_id: Some(id.clone()),
            id,
            user_id: Some(user_id),
            entry_type,
            content,
            image_url,
            alt_text: match entry_type {
                EntryType::Image => Some(ctx.alt_text.clone()),
                EntryType::Text => None,
            },
            url: ctx.url.clone(),
            title: ctx.title.clone(),
            page_context: ctx.page_context.clone(),
            category: String::new(),
            timestamp: Utc::now(),
        })
    }

    /// Embed and write an entry to both stores.
    ///
    /// The journal intent is recorded before the remote upsert and
    /// cleared only after the local mirror is written; whatever survives
    /// a crash is replayed by [`KnowledgeService::reconcile`].
    pub(crate) async fn persist_entry(&self, entry: Entry) -> Result<Entry> {
        let clients = self.ensure_ready().await?;
        let vector = clients.embedder.embed(&embedding_input(&entry)).await?;
        let record = VectorRecord {
            id: entry.id.clone(),
            values: vector,
            metadata: VectorMetadata::from_entry(&entry),
        };

        self.journal.record(&entry.id, PendingKind::Save).await?;
        clients.index.upsert(&[record]).await?;
        let entry = match self.store.save(entry).await {
            Ok(entry) => entry,
            Err(e) => {
                error!(
                    error = %e,
                    "partial failure: vector stored remotely but local mirror write failed"
                );
                return Err(e);
            }
        };
        self.journal.clear(&entry.id).await?;

        info!(entry_id = %entry.id, kind = %entry.entry_type, "entry saved");
        Ok(entry)
    }
}

/// Text handed to the embedding backend for an entry: the captured
/// content (or alt text for images) enriched with the page title and
/// nearby headings.
pub(crate) fn embedding_input(entry: &Entry) -> String {
    let headings = entry.page_context.joined_headings();
    match entry.entry_type {
        EntryType::Text => format!(
            "{}\n{}\n{}",
            entry.content.as_deref().unwrap_or(""),
            entry.title,
            headings
        ),
        EntryType::Image => format!(
            "{} {} {}",
            entry.alt_text.as_deref().unwrap_or(""),
            entry.title,
            headings
        ),
    }
}
