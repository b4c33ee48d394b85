//! Raw catalog import.
//!
//! Accepts either `{"<records_key>": [ ... ]}` or a bare JSON array of
//! record objects. Bad elements are collected as rejects instead of failing
//! the whole import.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use hotelsearch_core::config::CatalogConfig;
use hotelsearch_core::error::{HotelSearchError, Result};
use hotelsearch_core::types::Record;
use hotelsearch_vector::CatalogStore;

/// An element of the raw catalog that could not be imported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedRecord {
    /// Position of the element in the source array.
    pub index: usize,
    pub reason: String,
}

/// Outcome of parsing a raw catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogImport {
    /// Valid records in source order, unique by id.
    pub records: Vec<Record>,
    pub rejected: Vec<RejectedRecord>,
}

impl CatalogImport {
    /// Upsert every imported record into `store`. Returns the number of ids
    /// that were new to the store.
    pub fn apply_to(self, store: &CatalogStore) -> Result<usize> {
        let mut added = 0;
        for record in self.records {
            if store.upsert(record)? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Build a fresh store from the imported records.
    pub fn into_store(self) -> Result<CatalogStore> {
        let store = CatalogStore::new();
        self.apply_to(&store)?;
        Ok(store)
    }
}

/// Read and parse the raw catalog file at `path`.
pub fn load_catalog(path: &Path, config: &CatalogConfig) -> Result<CatalogImport> {
    let content = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)?;
    let import = parse_catalog(&value, &config.records_key, &config.id_field)?;
    info!(
        path = %path.display(),
        records = import.records.len(),
        rejected = import.rejected.len(),
        "Catalog loaded"
    );
    Ok(import)
}

/// Parse an already-decoded raw catalog document.
///
/// Elements with a missing or blank id, or with unsupported field values,
/// are rejected. When two elements share an id the first one wins and the
/// later one is rejected.
pub fn parse_catalog(value: &Value, records_key: &str, id_field: &str) -> Result<CatalogImport> {
    let elements = match value {
        Value::Array(items) => items,
        Value::Object(map) => match map.get(records_key) {
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(HotelSearchError::Validation(format!(
                    "catalog key '{}' must hold an array",
                    records_key
                )))
            }
            None => {
                return Err(HotelSearchError::Validation(format!(
                    "catalog object has no '{}' array",
                    records_key
                )))
            }
        },
        _ => {
            return Err(HotelSearchError::Validation(
                "catalog must be a JSON array or object".to_string(),
            ))
        }
    };

    let mut import = CatalogImport::default();
    let mut seen = HashSet::new();

    for (index, element) in elements.iter().enumerate() {
        let record = match Record::from_json(element, id_field) {
            Ok(record) => record,
            Err(e) => {
                warn!(index, error = %e, "Rejected catalog element");
                import.rejected.push(RejectedRecord {
                    index,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        if !seen.insert(record.id.clone()) {
            warn!(index, record_id = %record.id, "Duplicate record id in catalog");
            import.rejected.push(RejectedRecord {
                index,
                reason: format!("duplicate record id '{}'", record.id),
            });
            continue;
        }

        import.records.push(record);
    }

    Ok(import)
}
