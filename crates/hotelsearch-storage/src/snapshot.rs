//! Catalog + embedding snapshot persistence.
//!
//! A snapshot is a single JSON document:
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "embedder_version": "clip-vit-base-patch32",
//!   "dimensions": 512,
//!   "entries": [ { "record": { ... }, "embedding": { ... } } ]
//! }
//! ```
//!
//! Writes go to a sibling temp file that is renamed into place, so a crash
//! mid-write leaves the previous snapshot intact. Loading re-checks every
//! embedding against the active embedder: vectors from another version or of
//! the wrong size are dropped and their records come back unembedded.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use hotelsearch_core::error::{HotelSearchError, Result};
use hotelsearch_core::types::{EmbedderVersion, Embedding, Record};
use hotelsearch_vector::CatalogStore;

/// Current on-disk snapshot layout.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct SnapshotOut<'a> {
    format_version: u32,
    embedder_version: &'a EmbedderVersion,
    dimensions: usize,
    entries: Vec<EntryOut<'a>>,
}

#[derive(Serialize)]
struct EntryOut<'a> {
    record: &'a Record,
    #[serde(skip_serializing_if = "Option::is_none")]
    embedding: Option<&'a Embedding>,
}

#[derive(Deserialize)]
struct SnapshotIn {
    format_version: u32,
    embedder_version: EmbedderVersion,
    dimensions: usize,
    entries: Vec<EntryIn>,
}

#[derive(Deserialize)]
struct EntryIn {
    record: Record,
    #[serde(default)]
    embedding: Option<Embedding>,
}

/// What a snapshot load restored and what it discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotLoadReport {
    pub records: usize,
    /// Embeddings restored as current.
    pub embeddings_loaded: usize,
    /// Embeddings discarded for version, size, or value mismatches.
    pub embeddings_dropped: usize,
    /// Repeated record ids skipped (first occurrence wins).
    pub duplicates: usize,
}

/// Write every entry of `store` to `path`, tagged with the active embedder
/// version and dimensionality. Returns the number of entries written.
pub fn save_snapshot(
    store: &CatalogStore,
    path: &Path,
    version: &EmbedderVersion,
    dimensions: usize,
) -> Result<usize> {
    let entries = store.all_entries()?;
    let doc = SnapshotOut {
        format_version: SNAPSHOT_FORMAT_VERSION,
        embedder_version: version,
        dimensions,
        entries: entries
            .iter()
            .map(|entry| EntryOut {
                record: &entry.record,
                embedding: entry.embedding.as_deref(),
            })
            .collect(),
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = temp_path(path);
    {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer(&mut writer, &doc)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(HotelSearchError::Storage(format!(
            "Failed to move snapshot into {}: {}",
            path.display(),
            e
        )));
    }

    info!(path = %path.display(), entries = entries.len(), %version, "Snapshot saved");
    Ok(entries.len())
}

/// Load a snapshot into a fresh [`CatalogStore`].
///
/// Records always load. An embedding is kept only when it was produced by
/// `version` and has exactly `dimensions` finite components.
pub fn load_snapshot(
    path: &Path,
    version: &EmbedderVersion,
    dimensions: usize,
) -> Result<(CatalogStore, SnapshotLoadReport)> {
    let reader = BufReader::new(File::open(path)?);
    let doc: SnapshotIn = serde_json::from_reader(reader)?;

    if doc.format_version != SNAPSHOT_FORMAT_VERSION {
        return Err(HotelSearchError::Storage(format!(
            "Unsupported snapshot format version {} (expected {})",
            doc.format_version, SNAPSHOT_FORMAT_VERSION
        )));
    }
    if &doc.embedder_version != version || doc.dimensions != dimensions {
        warn!(
            snapshot_version = %doc.embedder_version,
            snapshot_dimensions = doc.dimensions,
            active_version = %version,
            active_dimensions = dimensions,
            "Snapshot written by a different embedder; stale vectors will be dropped"
        );
    }

    let store = CatalogStore::new();
    let mut report = SnapshotLoadReport::default();

    for entry in doc.entries {
        let id = entry.record.id.clone();
        if store.get(&id).is_ok() {
            report.duplicates += 1;
            continue;
        }
        store.upsert(entry.record)?;
        report.records += 1;

        let Some(embedding) = entry.embedding else {
            continue;
        };
        if embedding.version == *version
            && embedding.dimensions() == dimensions
            && embedding.is_finite()
        {
            store.attach_embedding(&id, embedding)?;
            report.embeddings_loaded += 1;
        } else {
            report.embeddings_dropped += 1;
        }
    }

    info!(
        path = %path.display(),
        records = report.records,
        embeddings_loaded = report.embeddings_loaded,
        embeddings_dropped = report.embeddings_dropped,
        "Snapshot loaded"
    );
    Ok((store, report))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "snapshot".into());
    name.push(".tmp");
    path.with_file_name(name)
}
