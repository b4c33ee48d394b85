//! Hotel search application binary - composition root.
//!
//! Ties the hotel search crates together into a single executable:
//! 1. Load configuration from TOML
//! 2. Build the embedding client
//! 3. Restore the catalog from the snapshot (or the raw catalog file)
//! 4. Run the requested command: serve, ingest, search, or stats

mod cli;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use hotelsearch_api::routes;
use hotelsearch_api::state::AppState;
use hotelsearch_core::config::HotelSearchConfig;
use hotelsearch_core::error::HotelSearchError;
use hotelsearch_core::types::EmbedderVersion;
use hotelsearch_storage::{load_catalog, load_snapshot, save_snapshot};
use hotelsearch_vector::{
    CatalogStore, DynEmbeddingService, HttpEmbeddingService, IngestionPipeline, SearchEngine,
    TextProjector,
};

use cli::{resolve_port, CliArgs, Command};

type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Load the config file if it exists, defaults otherwise. A file that exists
/// but does not parse or validate is an error.
fn load_config(path: &Path) -> AppResult<HotelSearchConfig> {
    if path.exists() {
        Ok(HotelSearchConfig::load(path)?)
    } else {
        Ok(HotelSearchConfig::default())
    }
}

/// Restore the catalog: the snapshot when present, else the raw catalog
/// file (unembedded), else an empty catalog.
fn open_catalog(
    config: &HotelSearchConfig,
    version: &EmbedderVersion,
    dimensions: usize,
) -> AppResult<CatalogStore> {
    let snapshot_path = config.snapshot_path();
    if snapshot_path.exists() {
        let (store, report) = load_snapshot(&snapshot_path, version, dimensions)?;
        if report.embeddings_dropped > 0 {
            tracing::warn!(
                dropped = report.embeddings_dropped,
                "Snapshot embeddings do not match the active embedder; run `hotelsearch ingest`"
            );
        }
        return Ok(store);
    }

    let catalog_path = config.catalog_path();
    if catalog_path.exists() {
        tracing::info!(
            path = %catalog_path.display(),
            "No snapshot found; loading raw catalog without embeddings"
        );
        let import = load_catalog(&catalog_path, &config.catalog)?;
        return Ok(import.into_store()?);
    }

    tracing::warn!(
        snapshot = %snapshot_path.display(),
        catalog = %catalog_path.display(),
        "No snapshot or catalog found; starting with an empty catalog"
    );
    Ok(CatalogStore::new())
}

async fn serve(
    config: HotelSearchConfig,
    port: Option<u16>,
    embedder: Arc<dyn DynEmbeddingService>,
) -> AppResult<()> {
    let catalog = open_catalog(&config, &embedder.version(), embedder.dimensions())?;

    let mut server_config = config.server.clone();
    server_config.port = resolve_port(port, server_config.port);

    let snapshot_path = config.snapshot_path();
    let save_after_ingest = config.storage.save_after_ingest;
    let mut state = AppState::new(config, catalog, embedder);
    if save_after_ingest {
        state = state.with_snapshot_path(snapshot_path);
    }

    routes::start_server(&server_config, state).await?;
    Ok(())
}

async fn ingest(
    config: HotelSearchConfig,
    catalog_arg: Option<std::path::PathBuf>,
    force: bool,
    embedder: Arc<dyn DynEmbeddingService>,
) -> AppResult<()> {
    let version = embedder.version();
    let dimensions = embedder.dimensions();

    let snapshot_path = config.snapshot_path();
    let store = if snapshot_path.exists() {
        load_snapshot(&snapshot_path, &version, dimensions)?.0
    } else {
        CatalogStore::new()
    };

    // An explicit --catalog must exist; the configured default may not.
    let catalog_path = catalog_arg
        .clone()
        .unwrap_or_else(|| config.catalog_path());
    if catalog_arg.is_some() || catalog_path.exists() {
        let import = load_catalog(&catalog_path, &config.catalog)?;
        for rejected in &import.rejected {
            tracing::warn!(index = rejected.index, reason = %rejected.reason, "Catalog element skipped");
        }
        let added = import.apply_to(&store)?;
        let total = store.len()?;
        tracing::info!(added, total, "Catalog merged");
    }

    let pipeline =
        IngestionPipeline::new_dyn(embedder, TextProjector::from_config(&config.projector));
    let report = pipeline.sync(&store, force).await?;

    let written = save_snapshot(&store, &snapshot_path, &version, dimensions)?;
    tracing::info!(path = %snapshot_path.display(), entries = written, "Snapshot written");

    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.is_complete() {
        return Err(HotelSearchError::Embedder(format!(
            "{} of {} records failed to embed",
            report.failed,
            report.failed + report.succeeded
        ))
        .into());
    }
    Ok(())
}

async fn search(
    config: HotelSearchConfig,
    query: String,
    top_k: Option<usize>,
    embedder: Arc<dyn DynEmbeddingService>,
) -> AppResult<()> {
    let catalog = open_catalog(&config, &embedder.version(), embedder.dimensions())?;
    let engine = SearchEngine::new_dyn(catalog, embedder)
        .with_query_timeout(Duration::from_millis(config.search.query_timeout_ms));

    let top_k = top_k
        .unwrap_or(config.search.default_top_k)
        .min(config.search.max_top_k);
    let hits = engine.search(&query, top_k).await?;

    if hits.is_empty() {
        println!("No results.");
    }
    for (rank, hit) in hits.iter().enumerate() {
        let name = hit
            .record
            .field("HotelName")
            .map(|v| v.to_text())
            .unwrap_or_default();
        println!("{:>3}. {:<12} {:.4}  {}", rank + 1, hit.id.as_str(), hit.score, name);
    }
    Ok(())
}

fn stats(config: &HotelSearchConfig, embedder: &dyn DynEmbeddingService) -> AppResult<()> {
    let version = embedder.version();
    let catalog = open_catalog(config, &version, embedder.dimensions())?;
    let stats = catalog.stats(&version)?;
    let out = serde_json::json!({
        "embedder_version": version.as_str(),
        "dimensions": embedder.dimensions(),
        "records": stats.records,
        "embedded": stats.embedded,
        "current": stats.current,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let config = load_config(&config_file)?;

    // Tracing to stderr; stdout carries command output. RUST_LOG overrides
    // the configured level.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(args.resolve_log_level(&config.general.log_level))
            }),
        )
        .init();

    tracing::info!("Starting hotelsearch v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Embedding service shared by ingestion and search.
    let embedder: Arc<dyn DynEmbeddingService> =
        Arc::new(HttpEmbeddingService::from_config(&config.embedder)?);
    tracing::info!(
        endpoint = %config.embedder.endpoint,
        version = %embedder.version(),
        dimensions = embedder.dimensions(),
        "Embedding service configured"
    );

    match args.command() {
        Command::Serve { port } => serve(config, port, embedder).await,
        Command::Ingest { catalog, force } => ingest(config, catalog, force, embedder).await,
        Command::Search { query, top_k } => search(config, query, top_k, embedder).await,
        Command::Stats => stats(&config, embedder.as_ref()),
    }
}
