//! Field registry entries.
//!
//! The registry holds one record per warehouse column, including recursively
//! expanded record sub-columns. Each entry has a stable dot-joined id (table
//! qualified, `samples.`-prefixed when sample scoped) and descriptive metadata
//! shown by downstream faceted-search UIs. Entries are written idempotently on
//! every dataset load.

use serde::Serialize;

/// Descriptive metadata for one indexable field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldRegistryEntry {
    /// Stable registry id, also the document id in the fields index.
    #[serde(skip_serializing)]
    pub id: String,
    /// Human-readable field name (the bare column path).
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldRegistryEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_entry_serialization_omits_id() {
        let entry = FieldRegistryEntry::new("participants.age", "age")
            .with_description(Some("Age at enrollment".to_string()));
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"name": "age", "description": "Age at enrollment"})
        );
    }

    #[test]
    fn test_registry_entry_serialization_omits_missing_description() {
        let entry = FieldRegistryEntry::new("participants.age", "age");
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value, serde_json::json!({"name": "age"}));
    }
}
