//! Application state shared across all route handlers.
//!
//! AppState holds references to all services and shared resources.
//! It is passed to handlers via axum's State extractor.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hotelsearch_core::config::HotelSearchConfig;
use hotelsearch_vector::{
    CatalogStore, DynEmbeddingService, IngestionPipeline, SearchEngine, TextProjector,
};

/// Shared application state.
///
/// All fields use `Arc` (or are cheap handles) for cloning across handler
/// tasks. The search engine and the pipeline share one catalog and one
/// embedder.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<HotelSearchConfig>,
    /// Records and their embeddings.
    pub catalog: CatalogStore,
    /// Query-time search over `catalog`.
    pub search_engine: Arc<SearchEngine>,
    /// Batch embedding of `catalog`.
    pub pipeline: Arc<IngestionPipeline>,
    /// Serializes ingestion runs; searches never take it.
    pub ingest_lock: Arc<tokio::sync::Mutex<()>>,
    /// Where to write the snapshot after an ingestion run, if anywhere.
    pub snapshot_path: Option<PathBuf>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Wire the search engine and pipeline around one catalog and embedder.
    pub fn new(
        config: HotelSearchConfig,
        catalog: CatalogStore,
        embedder: Arc<dyn DynEmbeddingService>,
    ) -> Self {
        let search_engine = SearchEngine::new_dyn(catalog.clone(), Arc::clone(&embedder))
            .with_query_timeout(Duration::from_millis(config.search.query_timeout_ms));
        let pipeline =
            IngestionPipeline::new_dyn(embedder, TextProjector::from_config(&config.projector));

        Self {
            config: Arc::new(config),
            catalog,
            search_engine: Arc::new(search_engine),
            pipeline: Arc::new(pipeline),
            ingest_lock: Arc::new(tokio::sync::Mutex::new(())),
            snapshot_path: None,
            start_time: Instant::now(),
        }
    }

    /// Persist the catalog to `path` after every ingestion run.
    pub fn with_snapshot_path(mut self, path: PathBuf) -> Self {
        self.snapshot_path = Some(path);
        self
    }
}
