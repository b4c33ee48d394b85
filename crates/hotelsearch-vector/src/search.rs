//! Query-time search: embed the query, score the catalog, return the top-K.
//!
//! Scoring is an exhaustive linear scan, O(N·D) per query. That is exact and
//! fast enough for catalogs up to the low tens of thousands of records;
//! beyond that, plug an approximate index in through [`CandidateSelector`].

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error};

use hotelsearch_core::error::{HotelSearchError, Result};
use hotelsearch_core::types::{Record, RecordId};

use crate::catalog::{CatalogEntry, CatalogStore};
use crate::embedding::{DynEmbeddingService, EmbeddingService};
use crate::vector::{check_dimensions, cosine_similarity};

/// Chooses which catalog entries get scored for a query.
///
/// Implementations must return a subset of `entries` in their original
/// relative order; ties in the final ranking are broken by that order.
pub trait CandidateSelector: Send + Sync {
    fn select(&self, query: &[f32], entries: Vec<Arc<CatalogEntry>>) -> Vec<Arc<CatalogEntry>>;
}

/// Scores every entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearScan;

impl CandidateSelector for LinearScan {
    fn select(&self, _query: &[f32], entries: Vec<Arc<CatalogEntry>>) -> Vec<Arc<CatalogEntry>> {
        entries
    }
}

/// A single ranked hit.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredRecord {
    pub id: RecordId,
    /// Cosine similarity in [-1, 1].
    pub score: f64,
    #[serde(skip)]
    pub record: Arc<Record>,
}

/// Hits ordered by descending score, ties in catalog order.
pub type QueryResult = Vec<ScoredRecord>;

/// Search engine over a [`CatalogStore`].
///
/// Read-only with respect to the catalog. The embedder is injected so tests
/// can substitute a deterministic stub.
pub struct SearchEngine {
    catalog: CatalogStore,
    embedder: Arc<dyn DynEmbeddingService>,
    selector: Box<dyn CandidateSelector>,
    query_timeout: Option<Duration>,
}

impl SearchEngine {
    /// Create a new search engine over a shared catalog.
    pub fn new(catalog: CatalogStore, embedder: impl EmbeddingService + 'static) -> Self {
        Self::new_dyn(catalog, Arc::new(embedder))
    }

    /// Create a search engine from a shared dynamic embedding service.
    pub fn new_dyn(catalog: CatalogStore, embedder: Arc<dyn DynEmbeddingService>) -> Self {
        Self {
            catalog,
            embedder,
            selector: Box::new(LinearScan),
            query_timeout: None,
        }
    }

    /// Replace the candidate selection step.
    pub fn with_selector(mut self, selector: impl CandidateSelector + 'static) -> Self {
        self.selector = Box::new(selector);
        self
    }

    /// Default timeout applied to the query embedding call by [`Self::search`].
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    /// Return the `top_k` catalog entries most similar to `query`.
    ///
    /// Fails with `Validation` for a blank query or `top_k == 0`. A `top_k`
    /// larger than the number of scorable entries returns all of them.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<QueryResult> {
        self.run(query, top_k, self.query_timeout).await
    }

    /// Like [`Self::search`], bounding the query embedding call by `timeout`.
    ///
    /// On expiry the search fails with `EmbedderTimeout`; no partial results
    /// are returned.
    pub async fn search_with_timeout(
        &self,
        query: &str,
        top_k: usize,
        timeout: Duration,
    ) -> Result<QueryResult> {
        self.run(query, top_k, Some(timeout)).await
    }

    async fn run(&self, query: &str, top_k: usize, timeout: Option<Duration>) -> Result<QueryResult> {
        let query = query.trim();
        if query.is_empty() {
            return Err(HotelSearchError::Validation(
                "query must be a non-empty string".to_string(),
            ));
        }
        if top_k == 0 {
            return Err(HotelSearchError::Validation(
                "top_k must be at least 1".to_string(),
            ));
        }

        let query_vec = self.embed_query(query, timeout).await?;
        check_dimensions(self.embedder.dimensions(), query_vec.len())?;
        if !query_vec.iter().all(|v| v.is_finite()) {
            return Err(HotelSearchError::Embedder(
                "query embedding contains non-finite values".to_string(),
            ));
        }

        let entries = self.catalog.all_entries()?;
        let results = self.rank(&query_vec, entries, top_k)?;
        debug!(query, top_k, hits = results.len(), "Search completed");
        Ok(results)
    }

    async fn embed_query(&self, query: &str, timeout: Option<Duration>) -> Result<Vec<f32>> {
        match timeout {
            None => self.embedder.embed_boxed(query).await,
            Some(limit) => tokio::time::timeout(limit, self.embedder.embed_boxed(query))
                .await
                .map_err(|_| HotelSearchError::EmbedderTimeout {
                    timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                })?,
        }
    }

    /// Score the candidates and keep the best `top_k`.
    ///
    /// Entries without an embedding, or with one from another embedder
    /// version, are skipped before scoring.
    fn rank(
        &self,
        query_vec: &[f32],
        entries: Vec<Arc<CatalogEntry>>,
        top_k: usize,
    ) -> Result<QueryResult> {
        let active = self.embedder.version();
        let candidates = self.selector.select(query_vec, entries);

        let mut skipped = 0usize;
        let mut scored: Vec<ScoredRecord> = Vec::with_capacity(candidates.len());
        for entry in candidates {
            let Some(embedding) = entry.embedding.as_ref().filter(|e| e.version == active) else {
                skipped += 1;
                continue;
            };

            let score = cosine_similarity(query_vec, &embedding.values).map_err(|e| {
                error!(
                    record_id = %entry.id(),
                    version = %active,
                    error = %e,
                    "Catalog embedding does not match the active embedder"
                );
                e
            })?;

            scored.push(ScoredRecord {
                id: entry.id().clone(),
                score,
                record: Arc::clone(&entry.record),
            });
        }

        if skipped > 0 {
            debug!(skipped, "Skipped unembedded or stale catalog entries");
        }

        // Stable sort: equal scores keep catalog order.
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        Ok(scored)
    }

    pub fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }

    pub fn embedder(&self) -> &Arc<dyn DynEmbeddingService> {
        &self.embedder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::MockEmbedding;
    use crate::testing::{MalformedEmbedding, SlowEmbedding, VocabularyEmbedding};
    use hotelsearch_core::types::{EmbedderVersion, Embedding};

    const VOCAB: [&str; 8] = [
        "luxury", "hotel", "paris", "spa", "budget", "hostel", "resort", "bali",
    ];

    fn rid(id: &str) -> RecordId {
        RecordId::new(id).unwrap()
    }

    fn vocab() -> VocabularyEmbedding {
        VocabularyEmbedding::new(&VOCAB, "vocab-v1")
    }

    async fn add(store: &CatalogStore, embedder: &VocabularyEmbedding, id: &str, text: &str) {
        store
            .upsert(Record::new(rid(id)).with_field("Description", text))
            .unwrap();
        let values = embedder.embed(text).await.unwrap();
        store
            .attach_embedding(
                &rid(id),
                Embedding::new(values, EmbeddingService::version(embedder)),
            )
            .unwrap();
    }

    async fn paris_catalog() -> CatalogStore {
        let store = CatalogStore::new();
        let embedder = vocab();
        add(&store, &embedder, "A", "Luxury hotel Paris spa").await;
        add(&store, &embedder, "B", "Budget hostel Paris").await;
        add(&store, &embedder, "C", "Luxury resort Bali").await;
        store
    }

    #[tokio::test]
    async fn test_search_ranks_best_match_first() {
        let engine = SearchEngine::new(paris_catalog().await, vocab());
        let results = engine.search("luxury Paris", 2).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id.as_str(), "A");
        assert!(results[0].score > results[1].score);
        // B and C tie; catalog order decides.
        assert_eq!(results[1].id.as_str(), "B");
    }

    #[tokio::test]
    async fn test_scores_match_independent_cosine() {
        let store = paris_catalog().await;
        let engine = SearchEngine::new(store.clone(), vocab());
        let results = engine.search("luxury Paris", 10).await.unwrap();
        let query_vec = vocab().embed("luxury Paris").await.unwrap();

        assert_eq!(results.len(), 3);
        for hit in &results {
            let entry = store.get(&hit.id).unwrap();
            let expected =
                cosine_similarity(&query_vec, &entry.embedding.as_ref().unwrap().values).unwrap();
            assert_eq!(hit.score, expected);
        }
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_search_is_deterministic() {
        let engine = SearchEngine::new(paris_catalog().await, vocab());
        let first = engine.search("paris", 3).await.unwrap();
        let second = engine.search("paris", 3).await.unwrap();
        let ids = |r: &QueryResult| r.iter().map(|h| (h.id.clone(), h.score)).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
    }

    #[tokio::test]
    async fn test_top_k_clamped_to_catalog() {
        let engine = SearchEngine::new(paris_catalog().await, vocab());
        let results = engine.search("bali", 100).await.unwrap();
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn test_rejects_blank_query_and_zero_k() {
        let engine = SearchEngine::new(paris_catalog().await, vocab());
        for query in ["", "   ", "\t\n"] {
            let err = engine.search(query, 5).await.unwrap_err();
            assert!(matches!(err, HotelSearchError::Validation(_)));
        }
        let err = engine.search("x", 0).await.unwrap_err();
        assert!(matches!(err, HotelSearchError::Validation(_)));
    }

    #[tokio::test]
    async fn test_skips_unembedded_entries() {
        let store = paris_catalog().await;
        store
            .upsert(Record::new(rid("D")).with_field("Description", "Luxury Paris"))
            .unwrap();

        let engine = SearchEngine::new(store, vocab());
        let results = engine.search("luxury Paris", 10).await.unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|h| h.id.as_str() != "D"));
    }

    #[tokio::test]
    async fn test_excludes_stale_versions() {
        let store = paris_catalog().await;
        // Perfect match, but produced by an older model with other dimensions.
        store
            .upsert(Record::new(rid("OLD")).with_field("Description", "luxury paris"))
            .unwrap();
        store
            .attach_embedding(
                &rid("OLD"),
                Embedding::new(vec![1.0, 1.0, 1.0], EmbedderVersion::new("vocab-v0")),
            )
            .unwrap();

        let engine = SearchEngine::new(store, vocab());
        let results = engine.search("luxury paris", 10).await.unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|h| h.id.as_str() != "OLD"));
    }

    #[tokio::test]
    async fn test_same_version_wrong_dimensions_is_internal_error() {
        let store = paris_catalog().await;
        store.upsert(Record::new(rid("BAD"))).unwrap();
        store
            .attach_embedding(
                &rid("BAD"),
                Embedding::new(vec![1.0, 0.0], EmbedderVersion::new("vocab-v1")),
            )
            .unwrap();

        let engine = SearchEngine::new(store, vocab());
        let err = engine.search("paris", 3).await.unwrap_err();
        assert!(matches!(err, HotelSearchError::DimensionMismatch { .. }));
        assert!(!err.is_client_error());
    }

    #[tokio::test]
    async fn test_non_finite_query_vector_is_embedder_error() {
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let mut output = vec![0.0; VOCAB.len()];
            output[0] = bad;
            output[2] = 1.0;
            let embedder = MalformedEmbedding {
                declared_dimensions: VOCAB.len(),
                output,
                version: EmbedderVersion::new("vocab-v1"),
            };
            let engine = SearchEngine::new(paris_catalog().await, embedder);

            let err = engine.search("luxury paris", 3).await.unwrap_err();
            assert!(matches!(err, HotelSearchError::Embedder(_)), "{:?}", err);
        }
    }

    #[tokio::test]
    async fn test_zero_query_vector_scores_neutral() {
        let engine = SearchEngine::new(paris_catalog().await, vocab());
        // No vocabulary words: zero query vector, every score is 0.0.
        let results = engine.search("castle", 3).await.unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|h| h.score == 0.0));
        let order: Vec<&str> = results.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_empty_catalog() {
        let engine = SearchEngine::new(CatalogStore::new(), MockEmbedding::new());
        let results = engine.search("anything", 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_embedder_failure_surfaces() {
        let embedder = vocab().failing_on("explode");
        let engine = SearchEngine::new(paris_catalog().await, embedder);
        let err = engine.search("explode now", 3).await.unwrap_err();
        assert!(matches!(err, HotelSearchError::Embedder(_)));
    }

    #[tokio::test]
    async fn test_search_with_timeout_expires() {
        let slow = SlowEmbedding::new(vocab(), Duration::from_millis(500));
        let engine = SearchEngine::new(paris_catalog().await, slow);
        let err = engine
            .search_with_timeout("paris", 3, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, HotelSearchError::EmbedderTimeout { timeout_ms: 20 }));
    }

    #[tokio::test]
    async fn test_default_query_timeout_applies() {
        let slow = SlowEmbedding::new(vocab(), Duration::from_millis(500));
        let engine = SearchEngine::new(paris_catalog().await, slow)
            .with_query_timeout(Duration::from_millis(20));
        let err = engine.search("paris", 3).await.unwrap_err();
        assert!(matches!(err, HotelSearchError::EmbedderTimeout { .. }));
    }

    #[tokio::test]
    async fn test_search_within_timeout_succeeds() {
        let slow = SlowEmbedding::new(vocab(), Duration::from_millis(5));
        let engine = SearchEngine::new(paris_catalog().await, slow);
        let results = engine
            .search_with_timeout("paris", 1, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    struct OnlyIds(Vec<&'static str>);

    impl CandidateSelector for OnlyIds {
        fn select(&self, _query: &[f32], entries: Vec<Arc<CatalogEntry>>) -> Vec<Arc<CatalogEntry>> {
            entries
                .into_iter()
                .filter(|e| self.0.contains(&e.id().as_str()))
                .collect()
        }
    }

    #[tokio::test]
    async fn test_custom_candidate_selector() {
        let engine =
            SearchEngine::new(paris_catalog().await, vocab()).with_selector(OnlyIds(vec!["C"]));
        let results = engine.search("luxury paris", 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id.as_str(), "C");
    }
}
