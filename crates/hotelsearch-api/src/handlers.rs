//! Route handler functions for all API endpoints.
//!
//! Each handler extracts path parameters or a JSON body via axum
//! extractors, calls into the catalog, search engine or pipeline, and
//! returns a JSON response.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use hotelsearch_core::types::{FieldValue, Record, RecordId};
use hotelsearch_storage::save_snapshot;
use hotelsearch_vector::{CatalogEntry, DynEmbeddingService, IngestReport};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request types
// =============================================================================

/// Request body for POST /search.
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: Option<String>,
    /// Signed; non-positive values are rejected with 400.
    pub top_k: Option<i64>,
}

/// Request body for POST /ingest. An empty body means `{}`.
#[derive(Debug, Default, Deserialize)]
pub struct IngestRequest {
    #[serde(default)]
    pub force: bool,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f64,
    pub fields: serde_json::Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub top_k: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecordResponse {
    pub id: String,
    pub fields: BTreeMap<String, FieldValue>,
    /// True when the record carries an embedding from the active embedder.
    pub embedded: bool,
    pub embedder_version: Option<String>,
}

impl RecordResponse {
    fn from_entry(entry: &CatalogEntry, state: &AppState) -> Self {
        let active = state.pipeline.version();
        Self {
            id: entry.id().to_string(),
            fields: entry.record.fields.clone(),
            embedded: entry.is_embedded_with(&active),
            embedder_version: entry.embedding.as_ref().map(|e| e.version.to_string()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub id: String,
    pub deleted: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    #[serde(flatten)]
    pub report: IngestReport,
    /// Whether a snapshot was written after the run.
    pub snapshot_saved: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub records: usize,
    pub embedded: usize,
    pub current: usize,
    pub embedder_version: String,
}

// =============================================================================
// Handler functions
// =============================================================================

/// POST /search - rank catalog records by similarity to a free-text query.
pub async fn search(
    State(state): State<AppState>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(body) = body?;
    let query = body
        .query
        .ok_or_else(|| ApiError::BadRequest("Field 'query' is required".to_string()))?;
    if query.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Field 'query' must not be empty".to_string(),
        ));
    }

    let search_config = &state.config.search;
    let top_k = match body.top_k {
        None => search_config.default_top_k,
        Some(k) if k <= 0 => {
            return Err(ApiError::BadRequest(format!(
                "Field 'top_k' must be positive, got {}",
                k
            )))
        }
        Some(k) => usize::try_from(k)
            .unwrap_or(usize::MAX)
            .min(search_config.max_top_k),
    };

    let hits = state.search_engine.search(&query, top_k).await?;
    let results = hits
        .into_iter()
        .map(|hit| SearchHit {
            id: hit.id.to_string(),
            score: hit.score,
            fields: hit.record.select_json(&search_config.result_fields),
        })
        .collect();

    Ok(Json(SearchResponse {
        query,
        top_k,
        results,
    }))
}

/// GET /records/{id} - fetch one record and its embedding status.
pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RecordResponse>, ApiError> {
    let id = RecordId::new(id)?;
    let entry = state.catalog.get(&id)?;
    Ok(Json(RecordResponse::from_entry(&entry, &state)))
}

/// PUT /records - insert or replace one record from its raw JSON form.
///
/// The record is not embedded here; it becomes searchable after the next
/// ingestion run. Responds 201 for a new id, 200 for a replacement.
pub async fn put_record(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<RecordResponse>), ApiError> {
    let Json(body) = body?;
    let record = Record::from_json(&body, &state.config.catalog.id_field)?;
    let id = record.id.clone();
    let created = state.catalog.upsert(record)?;
    let entry = state.catalog.get(&id)?;

    info!(record_id = %id, created, "Record upserted");
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(RecordResponse::from_entry(&entry, &state))))
}

/// DELETE /records/{id} - remove a record. Deleting a missing id succeeds
/// with `deleted: false`.
pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = RecordId::new(id)?;
    let deleted = state.catalog.delete(&id)?;
    Ok(Json(DeleteResponse {
        id: id.to_string(),
        deleted,
    }))
}

/// POST /ingest - embed every record that lacks a current embedding.
///
/// Runs are serialized; searches keep being served while one is in
/// progress.
pub async fn ingest(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<IngestResponse>, ApiError> {
    let request: IngestRequest = if body.iter().all(u8::is_ascii_whitespace) {
        IngestRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid ingest request: {}", e)))?
    };

    let _guard = state.ingest_lock.lock().await;
    let report = state.pipeline.sync(&state.catalog, request.force).await?;

    let snapshot_saved = match &state.snapshot_path {
        Some(path) => persist_snapshot(&state, path.clone()).await,
        None => false,
    };

    Ok(Json(IngestResponse {
        report,
        snapshot_saved,
    }))
}

async fn persist_snapshot(state: &AppState, path: std::path::PathBuf) -> bool {
    let catalog = state.catalog.clone();
    let version = state.pipeline.version();
    let dimensions = state.search_engine.embedder().dimensions();

    let result = tokio::task::spawn_blocking(move || {
        save_snapshot(&catalog, &path, &version, dimensions)
    })
    .await;

    match result {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            warn!(error = %e, "Failed to save snapshot after ingestion");
            false
        }
        Err(e) => {
            warn!(error = %e, "Snapshot task panicked");
            false
        }
    }
}

/// GET /health - liveness plus catalog coverage.
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let version = state.pipeline.version();
    let stats = state.catalog.stats(&version)?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        records: stats.records,
        embedded: stats.embedded,
        current: stats.current,
        embedder_version: version.to_string(),
    }))
}
