//! In-memory search index.
//!
//! Reference implementation of [`SearchIndexProvider`] holding documents in a
//! process-local map. It applies the same merge semantics the OpenSearch
//! Painless scripts implement server-side, which makes it both the executable
//! contract for the operation kinds and the backend used by hermetic tests
//! and dry runs.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::types::{BulkSummary, IndexOperation};

type Document = Map<String, Value>;

#[derive(Default)]
struct State {
    /// Index name to (document id to document).
    indices: HashMap<String, BTreeMap<String, Document>>,
    /// Settings bodies applied per index, in call order.
    settings_applied: HashMap<String, Vec<Value>>,
    /// Mapping bodies applied per index, in call order.
    mappings_applied: HashMap<String, Vec<Value>>,
}

/// Process-local search index with atomic per-document merges.
#[derive(Default)]
pub struct InMemoryIndex {
    state: Mutex<State>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the state for a provider operation. A poisoned lock means a
    /// writer panicked mid-merge, so the state is surfaced as an error
    /// instead of trusted.
    fn locked(&self) -> Result<MutexGuard<'_, State>, SearchIndexError> {
        self.state
            .lock()
            .map_err(|_| SearchIndexError::state("in-memory index lock poisoned"))
    }

    /// Lock the state for read-only assertions. Poisoning is ignored here
    /// since the accessors never mutate.
    fn peek(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch one document for assertions.
    pub fn document(&self, index: &str, id: &str) -> Option<Document> {
        let state = self.peek();
        state.indices.get(index)?.get(id).cloned()
    }

    /// Number of documents in one index.
    pub fn len(&self, index: &str) -> usize {
        let state = self.peek();
        state.indices.get(index).map_or(0, |docs| docs.len())
    }

    pub fn is_empty(&self, index: &str) -> bool {
        self.len(index) == 0
    }

    /// Settings bodies applied to one index, in call order. Used to assert
    /// the write-optimized/read-optimized bracket.
    pub fn applied_settings(&self, index: &str) -> Vec<Value> {
        let state = self.peek();
        state
            .settings_applied
            .get(index)
            .cloned()
            .unwrap_or_default()
    }

    /// Mapping bodies applied to one index, in call order.
    pub fn applied_mappings(&self, index: &str) -> Vec<Value> {
        let state = self.peek();
        state
            .mappings_applied
            .get(index)
            .cloned()
            .unwrap_or_default()
    }

    fn apply(document: &mut Document, operation: &IndexOperation) {
        match operation {
            IndexOperation::Upsert { doc, .. } => {
                // Partial update: new fields added, existing overwritten.
                for (key, value) in doc {
                    document.insert(key.clone(), value.clone());
                }
            }
            IndexOperation::ArrayMerge {
                array_field,
                key_column,
                element,
                ..
            } => {
                let entry = document
                    .entry(array_field.clone())
                    .or_insert_with(|| Value::Array(Vec::new()));
                if !entry.is_array() {
                    *entry = Value::Array(Vec::new());
                }
                if let Value::Array(items) = entry {
                    let key_value = element.get(key_column).cloned().unwrap_or(Value::Null);
                    let position = items
                        .iter()
                        .position(|item| item.get(key_column) == Some(&key_value));

                    match position {
                        Some(i) => {
                            if let Value::Object(fields) = &mut items[i] {
                                // Field-merge into the matching element; last
                                // writer wins per field.
                                for (key, value) in element {
                                    fields.insert(key.clone(), value.clone());
                                }
                            } else {
                                items[i] = Value::Object(element.clone());
                            }
                        }
                        None => items.push(Value::Object(element.clone())),
                    }
                }
            }
            IndexOperation::TimeSeriesInsert {
                bucket_key, fields, ..
            } => {
                for (column, value) in fields {
                    let bucket = document
                        .entry(column.clone())
                        .or_insert_with(|| json!({ "_is_time_series": true }));
                    if !bucket.is_object() {
                        *bucket = json!({ "_is_time_series": true });
                    }
                    if let Value::Object(bucket) = bucket {
                        bucket.insert(bucket_key.clone(), value.clone());
                    }
                }
            }
        }
    }
}

#[async_trait]
impl SearchIndexProvider for InMemoryIndex {
    async fn wait_until_healthy(&self) -> Result<(), SearchIndexError> {
        Ok(())
    }

    async fn ensure_index_exists(
        &self,
        index: &str,
        _body: &Value,
    ) -> Result<(), SearchIndexError> {
        let mut state = self.locked()?;
        state.indices.entry(index.to_string()).or_default();
        Ok(())
    }

    async fn recreate_index(&self, index: &str, _body: &Value) -> Result<(), SearchIndexError> {
        let mut state = self.locked()?;
        state.indices.insert(index.to_string(), BTreeMap::new());
        Ok(())
    }

    async fn put_mapping(&self, index: &str, mapping: &Value) -> Result<(), SearchIndexError> {
        let mut state = self.locked()?;
        state
            .mappings_applied
            .entry(index.to_string())
            .or_default()
            .push(mapping.clone());
        Ok(())
    }

    async fn put_settings(&self, index: &str, settings: &Value) -> Result<(), SearchIndexError> {
        let mut state = self.locked()?;
        state
            .settings_applied
            .entry(index.to_string())
            .or_default()
            .push(settings.clone());
        Ok(())
    }

    async fn bulk(
        &self,
        index: &str,
        operations: &[IndexOperation],
    ) -> Result<BulkSummary, SearchIndexError> {
        let mut state = self.locked()?;
        let documents = state.indices.entry(index.to_string()).or_default();

        for operation in operations {
            let document = documents.entry(operation.id().to_string()).or_default();
            Self::apply(document, operation);
        }

        Ok(BulkSummary {
            total: operations.len(),
            succeeded: operations.len(),
            failures: Vec::new(),
        })
    }

    async fn scan_all(&self, index: &str) -> Result<Vec<(String, Value)>, SearchIndexError> {
        let state = self.locked()?;
        Ok(state
            .indices
            .get(index)
            .map(|docs| {
                docs.iter()
                    .map(|(id, doc)| (id.clone(), Value::Object(doc.clone())))
                    .collect()
            })
            .unwrap_or_default())
    }
}
