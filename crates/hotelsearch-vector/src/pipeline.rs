//! Batch ingestion pipeline.
//!
//! Walks the catalog and (re)computes embeddings for every entry that lacks
//! a current one:
//! 1. Text projection of the record
//! 2. Staleness check (missing, other version, or changed source text)
//! 3. Embedding generation
//! 4. Output validation and attachment to the catalog
//!
//! A failed record is recorded and skipped; it never aborts the batch.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use hotelsearch_core::error::{HotelSearchError, Result};
use hotelsearch_core::types::{EmbedderVersion, Embedding, RecordId};

use crate::catalog::{CatalogEntry, CatalogStore};
use crate::embedding::{DynEmbeddingService, EmbeddingService};
use crate::projector::{blob_digest, TextProjector};

/// A record the pipeline could not embed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestFailure {
    pub id: RecordId,
    pub message: String,
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Entries that received a fresh embedding.
    pub succeeded: usize,
    /// Entries whose embedding could not be computed.
    pub failed: usize,
    /// Entries that were already current (or vanished mid-run).
    pub skipped: usize,
    pub failures: Vec<IngestFailure>,
}

impl IngestReport {
    /// Number of embeddings written by this run.
    pub fn updated(&self) -> usize {
        self.succeeded
    }

    /// True when no record failed.
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }

    fn fail(&mut self, id: &RecordId, error: &HotelSearchError) {
        warn!(record_id = %id, error = %error, "Failed to embed record");
        self.failed += 1;
        self.failures.push(IngestFailure {
            id: id.clone(),
            message: error.to_string(),
        });
    }
}

/// Populates a [`CatalogStore`] with embeddings.
///
/// The catalog lock is only taken to snapshot the entry list and to attach
/// each finished embedding, so searches keep running during a full
/// re-embedding.
pub struct IngestionPipeline {
    embedder: Arc<dyn DynEmbeddingService>,
    projector: TextProjector,
}

impl IngestionPipeline {
    /// Create a pipeline with the given embedder and projector.
    pub fn new(embedder: impl EmbeddingService + 'static, projector: TextProjector) -> Self {
        Self::new_dyn(Arc::new(embedder), projector)
    }

    /// Create a pipeline from a shared dynamic embedding service.
    pub fn new_dyn(embedder: Arc<dyn DynEmbeddingService>, projector: TextProjector) -> Self {
        Self { embedder, projector }
    }

    pub fn projector(&self) -> &TextProjector {
        &self.projector
    }

    /// Version tag of the embedder this pipeline runs.
    pub fn version(&self) -> EmbedderVersion {
        self.embedder.version()
    }

    /// Run against the embedder's own version.
    pub async fn sync(&self, store: &CatalogStore, force: bool) -> Result<IngestReport> {
        let version = self.embedder.version();
        self.run(store, &version, force).await
    }

    /// Embed every entry that is missing an embedding, carries one from a
    /// version other than `version`, or was computed from different source
    /// text. With `force`, every entry is recomputed.
    ///
    /// `version` must be the injected embedder's version: stamping vectors
    /// from one model with another model's tag is rejected as `VersionSkew`.
    /// Only catalog lock failures abort the run.
    pub async fn run(
        &self,
        store: &CatalogStore,
        version: &EmbedderVersion,
        force: bool,
    ) -> Result<IngestReport> {
        let active = self.embedder.version();
        if &active != version {
            return Err(HotelSearchError::VersionSkew {
                expected: active.to_string(),
                actual: version.to_string(),
            });
        }

        let entries = store.all_entries()?;
        info!(entries = entries.len(), %version, force, "Starting ingestion run");

        let mut report = IngestReport::default();
        for entry in entries {
            self.process(store, &entry, version, force, &mut report)
                .await?;
        }

        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            "Ingestion run finished"
        );
        Ok(report)
    }

    async fn process(
        &self,
        store: &CatalogStore,
        entry: &CatalogEntry,
        version: &EmbedderVersion,
        force: bool,
        report: &mut IngestReport,
    ) -> Result<()> {
        let id = entry.id();
        let blob = self.projector.project(&entry.record);
        let digest = blob_digest(&blob);

        if !force && Self::is_current(entry, version, digest) {
            report.skipped += 1;
            return Ok(());
        }

        let values = match self.embedder.embed_boxed(&blob).await {
            Ok(values) => values,
            Err(e) => {
                report.fail(id, &e);
                return Ok(());
            }
        };

        let expected = self.embedder.dimensions();
        if values.len() != expected {
            let e = HotelSearchError::DimensionMismatch {
                expected,
                actual: values.len(),
            };
            report.fail(id, &e);
            return Ok(());
        }

        let embedding = Embedding::new(values, version.clone()).with_source_digest(digest);
        if !embedding.is_finite() {
            let e = HotelSearchError::Embedder("embedding contains non-finite values".to_string());
            report.fail(id, &e);
            return Ok(());
        }

        match store.attach_embedding(id, embedding) {
            Ok(()) => {
                debug!(record_id = %id, "Embedding attached");
                report.succeeded += 1;
                Ok(())
            }
            Err(HotelSearchError::NotFound(_)) => {
                debug!(record_id = %id, "Record deleted during ingestion");
                report.skipped += 1;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// An entry is current when it carries an embedding of `version` computed
    /// from the same projected text. Embeddings with no recorded digest are
    /// trusted as current.
    fn is_current(entry: &CatalogEntry, version: &EmbedderVersion, digest: u64) -> bool {
        match &entry.embedding {
            Some(embedding) => {
                &embedding.version == version
                    && embedding.source_digest.map_or(true, |d| d == digest)
            }
            None => false,
        }
    }
}
