use thiserror::Error;

/// Top-level error type for the hotel search system.
///
/// Client-caused failures (`Validation`, `NotFound`) are reported straight
/// back to the caller. Embedder failures are external dependency errors and
/// surface as server errors on the query path. `DimensionMismatch` and
/// `VersionSkew` are internal-consistency violations and must never be
/// produced by a healthy catalog.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HotelSearchError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Embedder error: {0}")]
    Embedder(String),

    #[error("Embedder timed out after {timeout_ms} ms")]
    EmbedderTimeout { timeout_ms: u64 },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedder version skew: expected {expected}, got {actual}")]
    VersionSkew { expected: String, actual: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl HotelSearchError {
    /// True for errors caused by the caller's input rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            HotelSearchError::Validation(_) | HotelSearchError::NotFound(_)
        )
    }

    /// True for failures of the external embedding dependency.
    pub fn is_embedder_error(&self) -> bool {
        matches!(
            self,
            HotelSearchError::Embedder(_) | HotelSearchError::EmbedderTimeout { .. }
        )
    }
}

impl From<toml::de::Error> for HotelSearchError {
    fn from(err: toml::de::Error) -> Self {
        HotelSearchError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for HotelSearchError {
    fn from(err: toml::ser::Error) -> Self {
        HotelSearchError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for HotelSearchError {
    fn from(err: serde_json::Error) -> Self {
        HotelSearchError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for hotel search operations.
pub type Result<T> = std::result::Result<T, HotelSearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HotelSearchError::Validation("query must not be empty".to_string());
        assert_eq!(err.to_string(), "Validation error: query must not be empty");
    }

    #[test]
    fn test_error_display_structured_variants() {
        let cases: Vec<(HotelSearchError, &str)> = vec![
            (
                HotelSearchError::EmbedderTimeout { timeout_ms: 250 },
                "Embedder timed out after 250 ms",
            ),
            (
                HotelSearchError::DimensionMismatch {
                    expected: 512,
                    actual: 384,
                },
                "Dimension mismatch: expected 512, got 384",
            ),
            (
                HotelSearchError::VersionSkew {
                    expected: "clip-v2".to_string(),
                    actual: "clip-v1".to_string(),
                },
                "Embedder version skew: expected clip-v2, got clip-v1",
            ),
            (
                HotelSearchError::NotFound("record H1".to_string()),
                "Not found: record H1",
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_client_error_classification() {
        assert!(HotelSearchError::Validation("x".into()).is_client_error());
        assert!(HotelSearchError::NotFound("x".into()).is_client_error());
        assert!(!HotelSearchError::Embedder("down".into()).is_client_error());
        assert!(!HotelSearchError::EmbedderTimeout { timeout_ms: 1 }.is_client_error());
        assert!(!HotelSearchError::DimensionMismatch {
            expected: 2,
            actual: 3
        }
        .is_client_error());
    }

    #[test]
    fn test_embedder_error_classification() {
        assert!(HotelSearchError::Embedder("down".into()).is_embedder_error());
        assert!(HotelSearchError::EmbedderTimeout { timeout_ms: 5 }.is_embedder_error());
        assert!(!HotelSearchError::Storage("disk".into()).is_embedder_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: HotelSearchError = io_err.into();
        assert!(matches!(err, HotelSearchError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let converted: HotelSearchError = err.unwrap_err().into();
        assert!(matches!(converted, HotelSearchError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let converted: HotelSearchError = err.unwrap_err().into();
        assert!(matches!(converted, HotelSearchError::Serialization(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let value = io_result?;
            Ok(value.to_string())
        }

        assert_eq!(inner().unwrap(), "42");
    }
}
