//! Patient data access

use crate::error::DataSourceError;
use crate::record::{PatientId, PatientRecord};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value as JsonValue;
use std::path::Path;

/// Capability to load patient records by id
///
/// Implementations must be shareable across threads; evaluators hold them behind `Arc`.
pub trait PatientDataSource: Send + Sync {
    /// Fetch the records for `ids`
    ///
    /// Unknown ids are omitted from the result rather than reported as errors.
    fn fetch(&self, ids: &[PatientId]) -> Result<Vec<PatientRecord>, DataSourceError>;

    /// Attribute names every record may carry, when the source knows them
    fn attributes(&self) -> Option<Vec<String>> {
        None
    }
}

/// Patient records held in memory
#[derive(Debug, Default)]
pub struct InMemoryDataSource {
    records: RwLock<IndexMap<PatientId, PatientRecord>>,
    schema: Option<Vec<String>>,
}

impl InMemoryDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertise a fixed attribute schema for criteria validation
    pub fn with_schema(mut self, attributes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.schema = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    /// Insert or replace a record
    pub fn insert(&self, record: PatientRecord) {
        self.records.write().insert(record.id, record);
    }

    pub fn ids(&self) -> Vec<PatientId> {
        self.records.read().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Load from a JSON array of patient objects
    pub fn from_json(value: &JsonValue) -> Result<Self, DataSourceError> {
        let items = value
            .as_array()
            .ok_or_else(|| DataSourceError::InvalidData("expected a JSON array of patients".into()))?;
        let source = Self::new();
        for item in items {
            let record = PatientRecord::from_json(item).map_err(DataSourceError::InvalidData)?;
            source.insert(record);
        }
        log::debug!("Loaded {} patient records", source.len());
        Ok(source)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DataSourceError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| DataSourceError::Io(format!("{}: {}", path.display(), e)))?;
        let value: JsonValue = serde_json::from_str(&text)
            .map_err(|e| DataSourceError::InvalidData(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&value)
    }
}

impl FromIterator<PatientRecord> for InMemoryDataSource {
    fn from_iter<T: IntoIterator<Item = PatientRecord>>(iter: T) -> Self {
        let source = Self::new();
        for record in iter {
            source.insert(record);
        }
        source
    }
}

impl PatientDataSource for InMemoryDataSource {
    fn fetch(&self, ids: &[PatientId]) -> Result<Vec<PatientRecord>, DataSourceError> {
        let records = self.records.read();
        Ok(ids.iter().filter_map(|id| records.get(id).cloned()).collect())
    }

    fn attributes(&self) -> Option<Vec<String>> {
        self.schema.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_fetch_omits_unknown_ids() {
        let source: InMemoryDataSource = (1..=3i64).map(PatientRecord::new).collect();
        let records = source.fetch(&[PatientId(2), PatientId(9)]).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, PatientId(2));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", json!([{"id": 1, "age": 30}, {"id": 2, "age": 12}])).unwrap();

        let source = InMemoryDataSource::from_file(file.path()).unwrap();
        assert_eq!(source.ids(), vec![PatientId(1), PatientId(2)]);
        assert!(source.attributes().is_none());
    }

    #[test]
    fn test_from_file_missing() {
        let err = InMemoryDataSource::from_file("/nonexistent/patients.json").unwrap_err();
        assert!(matches!(err, DataSourceError::Io(_)));
    }
}
