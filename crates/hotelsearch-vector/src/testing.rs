//! Deterministic stub embedders for tests.
//!
//! Compiled for this crate's tests and, behind the `test-utils` feature, for
//! downstream crates' tests and benches.

use std::time::Duration;

use hotelsearch_core::error::HotelSearchError;
use hotelsearch_core::types::EmbedderVersion;

use crate::embedding::EmbeddingService;

/// Bag-of-words embedder with one axis per vocabulary word.
///
/// Tokens are lowercased and stripped of punctuation; unknown words are
/// ignored, so a text with no vocabulary words embeds to the zero vector.
/// Texts containing any `fail_on` marker fail with `Embedder`.
#[derive(Debug, Clone)]
pub struct VocabularyEmbedding {
    vocabulary: Vec<String>,
    version: EmbedderVersion,
    fail_on: Vec<String>,
}

impl VocabularyEmbedding {
    pub fn new(vocabulary: &[&str], version: &str) -> Self {
        Self {
            vocabulary: vocabulary.iter().map(|w| w.to_lowercase()).collect(),
            version: EmbedderVersion::new(version),
            fail_on: Vec::new(),
        }
    }

    /// Fail every text that contains `marker` (case-insensitive).
    pub fn failing_on(mut self, marker: &str) -> Self {
        self.fail_on.push(marker.to_lowercase());
        self
    }

    pub fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.vocabulary.len()];
        for token in text.split_whitespace() {
            let token: String = token
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase();
            if let Some(axis) = self.vocabulary.iter().position(|w| *w == token) {
                vector[axis] += 1.0;
            }
        }
        vector
    }
}

impl EmbeddingService for VocabularyEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, HotelSearchError> {
        let lowered = text.to_lowercase();
        if let Some(marker) = self.fail_on.iter().find(|m| lowered.contains(m.as_str())) {
            return Err(HotelSearchError::Embedder(format!(
                "model rejected input containing '{}'",
                marker
            )));
        }
        Ok(self.vectorize(text))
    }

    fn dimensions(&self) -> usize {
        self.vocabulary.len()
    }

    fn version(&self) -> EmbedderVersion {
        self.version.clone()
    }
}

/// Wraps another embedder and delays every call.
#[derive(Debug, Clone)]
pub struct SlowEmbedding<E> {
    inner: E,
    delay: Duration,
}

impl<E: EmbeddingService> SlowEmbedding<E> {
    pub fn new(inner: E, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

impl<E: EmbeddingService> EmbeddingService for SlowEmbedding<E> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, HotelSearchError> {
        tokio::time::sleep(self.delay).await;
        self.inner.embed(text).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn version(&self) -> EmbedderVersion {
        self.inner.version()
    }
}

/// Returns vectors of a fixed, wrong length (or with NaNs).
#[derive(Debug, Clone)]
pub struct MalformedEmbedding {
    pub declared_dimensions: usize,
    pub output: Vec<f32>,
    pub version: EmbedderVersion,
}

impl EmbeddingService for MalformedEmbedding {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, HotelSearchError> {
        Ok(self.output.clone())
    }

    fn dimensions(&self) -> usize {
        self.declared_dimensions
    }

    fn version(&self) -> EmbedderVersion {
        self.version.clone()
    }
}
