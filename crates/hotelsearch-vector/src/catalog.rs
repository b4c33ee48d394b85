//! In-memory catalog store binding each record to its derived embedding.
//!
//! Entries are immutable `Arc<CatalogEntry>` values; every mutation swaps in
//! a new entry under a short write lock. Readers clone the entry handles they
//! need and release the lock, so a query never sees a record paired with a
//! partially written embedding, and a long ingestion run only ever holds the
//! lock for one entry at a time.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tracing::debug;

use hotelsearch_core::error::{HotelSearchError, Result};
use hotelsearch_core::types::{EmbedderVersion, Embedding, Record, RecordId};

/// A record plus its optional embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub record: Arc<Record>,
    pub embedding: Option<Arc<Embedding>>,
}

impl CatalogEntry {
    pub fn id(&self) -> &RecordId {
        &self.record.id
    }

    /// True when the entry has an embedding produced by `version`.
    pub fn is_embedded_with(&self, version: &EmbedderVersion) -> bool {
        self.embedding
            .as_ref()
            .is_some_and(|e| &e.version == version)
    }
}

/// Counts describing the catalog's embedding coverage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    /// Records present.
    pub records: usize,
    /// Records with any embedding attached.
    pub embedded: usize,
    /// Records whose embedding matches the requested version.
    pub current: usize,
}

#[derive(Debug, Default)]
struct CatalogInner {
    /// Insertion sequence -> entry. Iteration order is catalog order.
    entries: BTreeMap<u64, Arc<CatalogEntry>>,
    /// Record id -> insertion sequence.
    index: HashMap<RecordId, u64>,
    next_seq: u64,
}

/// Thread-safe catalog of records and embeddings.
///
/// Cloning is cheap and yields a handle onto the same underlying store.
#[derive(Debug, Clone, Default)]
pub struct CatalogStore {
    inner: Arc<RwLock<CatalogInner>>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, CatalogInner>> {
        self.inner
            .read()
            .map_err(|e| HotelSearchError::Storage(format!("Lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, CatalogInner>> {
        self.inner
            .write()
            .map_err(|e| HotelSearchError::Storage(format!("Lock poisoned: {}", e)))
    }

    /// Insert or replace a record.
    ///
    /// A replaced record keeps its catalog position and its current
    /// embedding; the ingestion pipeline decides whether that embedding is
    /// still valid. A new record starts without an embedding. Returns `true`
    /// when the id was new.
    pub fn upsert(&self, record: Record) -> Result<bool> {
        let mut inner = self.write()?;
        let record = Arc::new(record);

        if let Some(&seq) = inner.index.get(&record.id) {
            let embedding = inner
                .entries
                .get(&seq)
                .and_then(|entry| entry.embedding.clone());
            inner
                .entries
                .insert(seq, Arc::new(CatalogEntry { record, embedding }));
            return Ok(false);
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.index.insert(record.id.clone(), seq);
        debug!(record_id = %record.id, seq, "Record inserted");
        inner.entries.insert(
            seq,
            Arc::new(CatalogEntry {
                record,
                embedding: None,
            }),
        );
        Ok(true)
    }

    /// Attach (or overwrite) the embedding of an existing record.
    ///
    /// Fails with `NotFound` if the id is absent; never creates an entry.
    pub fn attach_embedding(&self, id: &RecordId, embedding: Embedding) -> Result<()> {
        let mut inner = self.write()?;
        let seq = *inner
            .index
            .get(id)
            .ok_or_else(|| HotelSearchError::NotFound(format!("record {}", id)))?;
        let record = match inner.entries.get(&seq) {
            Some(entry) => Arc::clone(&entry.record),
            None => {
                return Err(HotelSearchError::Storage(format!(
                    "catalog index out of sync for record {}",
                    id
                )))
            }
        };
        inner.entries.insert(
            seq,
            Arc::new(CatalogEntry {
                record,
                embedding: Some(Arc::new(embedding)),
            }),
        );
        Ok(())
    }

    pub fn get(&self, id: &RecordId) -> Result<Arc<CatalogEntry>> {
        let inner = self.read()?;
        inner
            .index
            .get(id)
            .and_then(|seq| inner.entries.get(seq))
            .cloned()
            .ok_or_else(|| HotelSearchError::NotFound(format!("record {}", id)))
    }

    /// All entries in insertion order, as a consistent point-in-time snapshot.
    pub fn all_entries(&self) -> Result<Vec<Arc<CatalogEntry>>> {
        let inner = self.read()?;
        Ok(inner.entries.values().cloned().collect())
    }

    /// Remove a record and its embedding. Returns `true` if it existed.
    pub fn delete(&self, id: &RecordId) -> Result<bool> {
        let mut inner = self.write()?;
        match inner.index.remove(id) {
            Some(seq) => {
                inner.entries.remove(&seq);
                debug!(record_id = %id, "Record deleted");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn stats(&self, version: &EmbedderVersion) -> Result<CatalogStats> {
        let inner = self.read()?;
        let mut stats = CatalogStats {
            records: inner.entries.len(),
            ..CatalogStats::default()
        };
        for entry in inner.entries.values() {
            if let Some(embedding) = &entry.embedding {
                stats.embedded += 1;
                if &embedding.version == version {
                    stats.current += 1;
                }
            }
        }
        Ok(stats)
    }

    /// Return the number of records currently stored.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.entries.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
