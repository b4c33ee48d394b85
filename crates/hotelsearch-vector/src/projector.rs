//! Reduces a structured record to the single text blob fed to the embedder.

use hotelsearch_core::config::{ProjectorConfig, DEFAULT_PROJECTED_FIELDS};
use hotelsearch_core::types::Record;

/// Deterministic record-to-text projection over an ordered field list.
///
/// Each selected field contributes its text form (lists joined by single
/// spaces, missing fields as the empty string); the pieces are joined with
/// single spaces and the result is trimmed. The projection depends only on
/// the record, never on catalog state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextProjector {
    fields: Vec<String>,
}

impl Default for TextProjector {
    fn default() -> Self {
        Self::new(DEFAULT_PROJECTED_FIELDS.iter().map(|s| s.to_string()))
    }
}

impl TextProjector {
    pub fn new(fields: impl IntoIterator<Item = String>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
        }
    }

    pub fn from_config(config: &ProjectorConfig) -> Self {
        Self::new(config.fields.iter().cloned())
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn project(&self, record: &Record) -> String {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|name| record.field(name).map(|v| v.to_text()).unwrap_or_default())
            .collect();
        parts.join(" ").trim().to_string()
    }
}

/// Stable 64-bit FNV-1a digest of a text blob.
///
/// Stored alongside embeddings so the pipeline can tell when a record's
/// projected text changed. Must stay stable across processes and releases,
/// which rules out `DefaultHasher`.
pub fn blob_digest(blob: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    blob.as_bytes().iter().fold(OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(PRIME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotelsearch_core::types::{FieldValue, RecordId};

    fn hotel() -> Record {
        Record::new(RecordId::new("H1").unwrap())
            .with_field("HotelName", "Le Grand")
            .with_field("Description", "Luxury hotel")
            .with_field("HotelFacilities", vec!["Spa", "Pool"])
            .with_field("Address", "1 Rue de Rivoli")
            .with_field("CityName", "Paris")
            .with_field("CountryName", "France")
            .with_field("Ignored", "not projected")
    }

    #[test]
    fn test_project_default_fields_in_order() {
        let blob = TextProjector::default().project(&hotel());
        assert_eq!(
            blob,
            "Le Grand Luxury hotel Spa Pool 1 Rue de Rivoli Paris France"
        );
    }

    #[test]
    fn test_project_missing_fields_are_empty() {
        let record = Record::new(RecordId::new("H2").unwrap())
            .with_field("HotelName", "Inn")
            .with_field("CityName", "Bali");
        // Missing middle fields leave their separators in place.
        assert_eq!(TextProjector::default().project(&record), "Inn    Bali");
    }

    #[test]
    fn test_project_trims_edges() {
        let record = Record::new(RecordId::new("H3").unwrap()).with_field("CountryName", "Peru");
        assert_eq!(TextProjector::default().project(&record), "Peru");
    }

    #[test]
    fn test_project_all_empty() {
        let record = Record::new(RecordId::new("H4").unwrap());
        assert_eq!(TextProjector::default().project(&record), "");
    }

    #[test]
    fn test_project_stringifies_scalars() {
        let projector = TextProjector::new(vec!["Stars".to_string(), "Open".to_string()]);
        let record = Record::new(RecordId::new("H5").unwrap())
            .with_field("Stars", FieldValue::Number(5.into()))
            .with_field("Open", FieldValue::Bool(true));
        assert_eq!(projector.project(&record), "5 true");
    }

    #[test]
    fn test_project_deterministic_across_ids() {
        let projector = TextProjector::default();
        let mut other = hotel();
        other.id = RecordId::new("H99").unwrap();
        assert_eq!(projector.project(&hotel()), projector.project(&other));
    }

    #[test]
    fn test_from_config() {
        let config = ProjectorConfig {
            fields: vec!["CityName".to_string(), "HotelName".to_string()],
        };
        let projector = TextProjector::from_config(&config);
        assert_eq!(projector.project(&hotel()), "Paris Le Grand");
        assert_eq!(projector.fields().len(), 2);
    }

    #[test]
    fn test_blob_digest_stable() {
        // FNV-1a reference values.
        assert_eq!(blob_digest(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(blob_digest("a"), 0xaf63_dc4c_8601_ec8c);
        assert_ne!(blob_digest("Paris"), blob_digest("paris"));
    }
}
