//! Hotel search vector crate - vector math, embedding boundary, catalog
//! store, query engine, and the batch ingestion pipeline.
//!
//! Data flows record -> `TextProjector` -> `EmbeddingService` ->
//! `CatalogStore` (embedding attached) -> `SearchEngine` at query time.
//! `IngestionPipeline` populates the store ahead of queries.

pub mod catalog;
pub mod embedding;
pub mod pipeline;
pub mod projector;
pub mod search;
pub mod vector;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use catalog::{CatalogEntry, CatalogStats, CatalogStore};
pub use embedding::{DynEmbeddingService, EmbeddingService, HttpEmbeddingService, MockEmbedding};
pub use pipeline::{IngestFailure, IngestReport, IngestionPipeline};
pub use projector::TextProjector;
pub use search::{CandidateSelector, LinearScan, QueryResult, ScoredRecord, SearchEngine};
pub use vector::cosine_similarity;
