//! Embedding service trait and implementations.
//!
//! - `HttpEmbeddingService` calls an external OpenAI-compatible embeddings
//!   endpoint. This is the production embedding backend.
//! - `MockEmbedding` provides deterministic hash-based vectors for testing
//!   and offline runs.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use hotelsearch_core::config::EmbedderConfig;
use hotelsearch_core::error::HotelSearchError;
use hotelsearch_core::types::EmbedderVersion;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Service for generating text embeddings.
///
/// Implementations convert text into fixed-dimensional vectors. The same
/// service instance is shared by ingestion (records) and search (queries),
/// and every vector it produces is tagged with [`EmbeddingService::version`].
pub trait EmbeddingService: Send + Sync {
    /// Generate an embedding vector for the given text.
    fn embed(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Vec<f32>, HotelSearchError>> + Send;

    /// Return the dimensionality of vectors produced by this service.
    fn dimensions(&self) -> usize;

    /// Identifier of the model/configuration behind this service.
    fn version(&self) -> EmbedderVersion;
}

/// Object-safe version of [`EmbeddingService`] for dynamic dispatch.
///
/// Because `EmbeddingService::embed` returns `impl Future` it is not
/// object-safe. This trait uses a boxed future instead, allowing
/// `Arc<dyn DynEmbeddingService>` to be shared between the search engine and
/// the ingestion pipeline.
pub trait DynEmbeddingService: Send + Sync {
    /// Generate an embedding vector for the given text (boxed future).
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Vec<f32>, HotelSearchError>> + Send + 'a>,
    >;

    /// Return the dimensionality of vectors produced by this service.
    fn dimensions(&self) -> usize;

    /// Identifier of the model/configuration behind this service.
    fn version(&self) -> EmbedderVersion;
}

/// Blanket impl: any `EmbeddingService` automatically implements `DynEmbeddingService`.
impl<T: EmbeddingService> DynEmbeddingService for T {
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Vec<f32>, HotelSearchError>> + Send + 'a>,
    > {
        Box::pin(self.embed(text))
    }

    fn dimensions(&self) -> usize {
        EmbeddingService::dimensions(self)
    }

    fn version(&self) -> EmbedderVersion {
        EmbeddingService::version(self)
    }
}

// ---------------------------------------------------------------------------
// HttpEmbeddingService - external inference service
// ---------------------------------------------------------------------------

/// Client for an OpenAI-compatible `POST {endpoint}/embeddings` service.
///
/// The per-request timeout is owned here: an elapsed request surfaces as
/// `HotelSearchError::EmbedderTimeout`. Rate limiting (429), server errors and
/// connection failures are retried with exponential backoff; timeouts are not.
#[derive(Clone)]
pub struct HttpEmbeddingService {
    client: reqwest::Client,
    url: String,
    model: String,
    version: EmbedderVersion,
    dimensions: usize,
    timeout: Duration,
    max_retries: usize,
}

impl std::fmt::Debug for HttpEmbeddingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEmbeddingService")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("version", &self.version)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

impl HttpEmbeddingService {
    /// Build a client for the given endpoint base URL (e.g. `http://host/v1`).
    pub fn new(
        endpoint: &str,
        model: impl Into<String>,
        version: EmbedderVersion,
        dimensions: usize,
        timeout: Duration,
        api_key: Option<String>,
        max_retries: usize,
    ) -> Result<Self, HotelSearchError> {
        if endpoint.trim().is_empty() {
            return Err(HotelSearchError::Config(
                "embedder endpoint must not be empty".to_string(),
            ));
        }
        if dimensions == 0 {
            return Err(HotelSearchError::Config(
                "embedder dimensions must be positive".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {}", key.trim()))
                .map_err(|e| HotelSearchError::Config(format!("invalid embedder API key: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| HotelSearchError::Config(format!("failed to build HTTP client: {}", e)))?;

        let url = format!("{}/embeddings", endpoint.trim_end_matches('/'));
        info!(%url, %version, dimensions, "Configured HTTP embedding service");

        Ok(Self {
            client,
            url,
            model: model.into(),
            version,
            dimensions,
            timeout,
            max_retries: max_retries.max(1),
        })
    }

    /// Build from the `[embedder]` configuration section.
    ///
    /// The API key, if any, is read from the environment variable named by
    /// `api_key_env`.
    pub fn from_config(config: &EmbedderConfig) -> Result<Self, HotelSearchError> {
        let api_key = config
            .api_key_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok());
        Self::new(
            &config.endpoint,
            config.model.clone(),
            EmbedderVersion::new(config.version.clone()),
            config.dimensions,
            Duration::from_millis(config.timeout_ms),
            api_key,
            config.max_retries,
        )
    }

    fn timeout_error(&self) -> HotelSearchError {
        HotelSearchError::EmbedderTimeout {
            timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    fn retry_backoff(attempt: usize) -> Duration {
        let capped = attempt.min(5) as u32;
        Duration::from_millis(100 * (1 << capped))
    }

    fn should_retry(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    async fn request_once(&self, text: &str) -> Result<Vec<f32>, (bool, HotelSearchError)> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: [text],
        };

        let response = self.client.post(&self.url).json(&body).send().await;
        let response = match response {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => return Err((false, self.timeout_error())),
            Err(e) => {
                let retryable = e.is_connect() || e.is_request();
                return Err((
                    retryable,
                    HotelSearchError::Embedder(format!("request failed: {}", e)),
                ));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err((
                Self::should_retry(status),
                HotelSearchError::Embedder(format!("service returned {}: {}", status, body)),
            ));
        }

        let parsed: EmbeddingResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) if e.is_timeout() => return Err((false, self.timeout_error())),
            Err(e) => {
                return Err((
                    false,
                    HotelSearchError::Embedder(format!("malformed response: {}", e)),
                ))
            }
        };

        let embedding = parsed
            .data
            .into_iter()
            .min_by_key(|entry| entry.index)
            .map(|entry| entry.embedding)
            .ok_or_else(|| {
                (
                    false,
                    HotelSearchError::Embedder("response contained no embeddings".to_string()),
                )
            })?;

        if embedding.len() != self.dimensions {
            return Err((
                false,
                HotelSearchError::DimensionMismatch {
                    expected: self.dimensions,
                    actual: embedding.len(),
                },
            ));
        }
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err((
                false,
                HotelSearchError::Embedder("response contained non-finite values".to_string()),
            ));
        }

        Ok(embedding)
    }
}

impl EmbeddingService for HttpEmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, HotelSearchError> {
        let mut attempt = 0usize;
        loop {
            match self.request_once(text).await {
                Ok(embedding) => return Ok(embedding),
                Err((true, e)) if attempt + 1 < self.max_retries => {
                    attempt += 1;
                    let backoff = Self::retry_backoff(attempt);
                    warn!(error = %e, attempt, ?backoff, "Retrying embedding request");
                    tokio::time::sleep(backoff).await;
                }
                Err((_, e)) => {
                    debug!(error = %e, attempt, "Embedding request failed");
                    return Err(e);
                }
            }
        }
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn version(&self) -> EmbedderVersion {
        self.version.clone()
    }
}

// ---------------------------------------------------------------------------
// MockEmbedding - deterministic hash-based vectors for testing
// ---------------------------------------------------------------------------

/// Mock embedding service that returns deterministic vectors.
///
/// The output is derived from a hash of the whole input text, so identical
/// inputs always produce identical outputs. Similar texts are *not* close in
/// this space; use it for plumbing, not for relevance.
#[derive(Debug, Clone)]
pub struct MockEmbedding {
    dimensions: usize,
    version: EmbedderVersion,
}

impl Default for MockEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEmbedding {
    pub const DEFAULT_DIMENSIONS: usize = 512;

    pub fn new() -> Self {
        Self::with_dimensions(Self::DEFAULT_DIMENSIONS)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions,
            version: EmbedderVersion::new(format!("mock-hash-{}", dimensions)),
        }
    }

    /// Override the version tag, e.g. to simulate a model upgrade.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = EmbedderVersion::new(version);
        self
    }

    fn hash_to_vector(&self, text: &str) -> Vec<f32> {
        let mut result = Vec::with_capacity(self.dimensions);
        for i in 0..self.dimensions {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            i.hash(&mut hasher);
            let h = hasher.finish();
            let val = ((h as f64) / (u64::MAX as f64)) * 2.0 - 1.0;
            result.push(val as f32);
        }

        // L2-normalize to produce unit vectors like a sentence-embedding model.
        let norm: f32 = result.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut result {
                *val /= norm;
            }
        }

        result
    }
}

impl EmbeddingService for MockEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, HotelSearchError> {
        Ok(self.hash_to_vector(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn version(&self) -> EmbedderVersion {
        self.version.clone()
    }
}
