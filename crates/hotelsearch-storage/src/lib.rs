//! Hotel search storage crate - raw catalog import and embedding snapshots.
//!
//! The raw catalog is the JSON document records are ingested from. The
//! snapshot is the persisted form of a populated [`CatalogStore`], so a
//! restart does not have to re-embed the whole catalog.
//!
//! [`CatalogStore`]: hotelsearch_vector::CatalogStore

pub mod catalog;
pub mod snapshot;

pub use catalog::{load_catalog, parse_catalog, CatalogImport, RejectedRecord};
pub use snapshot::{load_snapshot, save_snapshot, SnapshotLoadReport, SNAPSHOT_FORMAT_VERSION};
