use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{HotelSearchError, Result};

/// Default field list projected into the embedder input, in order.
pub const DEFAULT_PROJECTED_FIELDS: [&str; 6] = [
    "HotelName",
    "Description",
    "HotelFacilities",
    "Address",
    "CityName",
    "CountryName",
];

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        Some(rest) => {
            let home = std::env::var("HOME")
                .or_else(|_| std::env::var("USERPROFILE"))
                .unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(rest)
        }
        None => PathBuf::from(path),
    }
}

fn default_fields() -> Vec<String> {
    DEFAULT_PROJECTED_FIELDS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Top-level configuration for the hotel search service.
///
/// Loaded from `~/.hotelsearch/config.toml` by default. Every section falls
/// back to its defaults when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HotelSearchConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub projector: ProjectorConfig,
    #[serde(default)]
    pub embedder: EmbedderConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl HotelSearchConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: HotelSearchConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject settings that would make the pipeline or query path unusable.
    pub fn validate(&self) -> Result<()> {
        if self.catalog.id_field.trim().is_empty() {
            return Err(HotelSearchError::Config(
                "catalog.id_field must not be empty".to_string(),
            ));
        }
        if self.projector.fields.is_empty() {
            return Err(HotelSearchError::Config(
                "projector.fields must list at least one field".to_string(),
            ));
        }
        if self.embedder.dimensions == 0 {
            return Err(HotelSearchError::Config(
                "embedder.dimensions must be positive".to_string(),
            ));
        }
        if self.embedder.version.trim().is_empty() {
            return Err(HotelSearchError::Config(
                "embedder.version must not be empty".to_string(),
            ));
        }
        if self.search.default_top_k == 0 || self.search.max_top_k == 0 {
            return Err(HotelSearchError::Config(
                "search.default_top_k and search.max_top_k must be positive".to_string(),
            ));
        }
        if self.search.default_top_k > self.search.max_top_k {
            return Err(HotelSearchError::Config(format!(
                "search.default_top_k ({}) exceeds search.max_top_k ({})",
                self.search.default_top_k, self.search.max_top_k
            )));
        }
        Ok(())
    }

    /// Resolved data directory.
    pub fn data_dir(&self) -> PathBuf {
        expand_home(&self.general.data_dir)
    }

    /// Resolved snapshot path. Relative paths live under the data directory.
    pub fn snapshot_path(&self) -> PathBuf {
        let path = expand_home(&self.storage.snapshot_path);
        if path.is_absolute() {
            path
        } else {
            self.data_dir().join(path)
        }
    }

    /// Resolved raw catalog path. Relative paths are taken from the working
    /// directory.
    pub fn catalog_path(&self) -> PathBuf {
        expand_home(&self.catalog.path)
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory for snapshots and other runtime state.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.hotelsearch/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Raw catalog ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Path of the raw catalog JSON file.
    pub path: String,
    /// Field holding each record's unique id.
    pub id_field: String,
    /// Top-level key holding the record array. Bare arrays are also accepted.
    pub records_key: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: "data/hotels.json".to_string(),
            id_field: "HotelCode".to_string(),
            records_key: "detail".to_string(),
        }
    }
}

/// Text projection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectorConfig {
    /// Ordered field names concatenated into the embedder input.
    pub fields: Vec<String>,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            fields: default_fields(),
        }
    }
}

/// External embedding service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderConfig {
    /// Base URL of an OpenAI-compatible embeddings endpoint.
    pub endpoint: String,
    /// Model name sent with every request.
    pub model: String,
    /// Version tag stamped on every stored embedding.
    pub version: String,
    /// Expected output dimensionality.
    pub dimensions: usize,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Environment variable holding the API key, if the service needs one.
    pub api_key_env: Option<String>,
    /// Attempts for retryable failures (429 / 5xx / connect errors).
    pub max_retries: usize,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080/v1".to_string(),
            model: "clip-vit-base-patch32".to_string(),
            version: "clip-vit-base-patch32".to_string(),
            dimensions: 512,
            timeout_ms: 10_000,
            api_key_env: None,
            max_retries: 3,
        }
    }
}

/// Query path settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Results returned when a request omits `top_k`.
    pub default_top_k: usize,
    /// Upper bound accepted from clients.
    pub max_top_k: usize,
    /// Timeout applied to the query embedding call, in milliseconds.
    pub query_timeout_ms: u64,
    /// Record fields echoed back with each result.
    pub result_fields: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            max_top_k: 100,
            query_timeout_ms: 5_000,
            result_fields: default_fields(),
        }
    }
}

/// Embedding snapshot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path of the persisted catalog + embedding snapshot, relative to
    /// `general.data_dir` unless absolute.
    pub snapshot_path: String,
    /// Write the snapshot after every ingestion run.
    pub save_after_ingest: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_path: "hotel_embeddings.json".to_string(),
            save_after_ingest: true,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5005,
        }
    }
}
