//! Operation and result types for search index writes.
//!
//! Merge logic is expressed as a small fixed set of statically-typed
//! operations rather than backend script text. The operation semantics are
//! the portable contract: each backend translates them into whatever native
//! partial-update primitive it offers (Painless scripts for OpenSearch,
//! direct map mutation for the in-memory index).

use serde_json::{Map, Value};

/// One per-entity write against the search index.
///
/// Every variant is idempotent per document id with last-writer-wins
/// semantics per leaf field, which is what makes hash-partitioned parallel
/// execution safe without cross-worker coordination.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexOperation {
    /// Plain partial-document upsert. New fields are added, existing fields
    /// overwritten, and the document is created if absent.
    Upsert {
        id: String,
        doc: Map<String, Value>,
    },
    /// Append-or-merge-by-key on a nested array field. If no element of
    /// `array_field` carries the element's value for `key_column`, the
    /// element is appended; otherwise the incoming attributes are merged
    /// field-by-field into the existing element. Element identity by key is
    /// unique after the merge.
    ArrayMerge {
        id: String,
        /// Array field on the entity document, e.g. `samples` or `files`.
        array_field: String,
        /// Bare column acting as the element merge key.
        key_column: String,
        element: Map<String, Value>,
    },
    /// Dynamic-key time-series insert. For every column in `fields`, ensures
    /// a nested bucket marked with `_is_time_series: true` exists, then sets
    /// the bucket's entry for `bucket_key` to the column's value.
    TimeSeriesInsert {
        id: String,
        /// Stringified pivot value with dots replaced by underscores.
        bucket_key: String,
        fields: Map<String, Value>,
    },
}

impl IndexOperation {
    /// The entity document id this operation targets.
    pub fn id(&self) -> &str {
        match self {
            IndexOperation::Upsert { id, .. }
            | IndexOperation::ArrayMerge { id, .. }
            | IndexOperation::TimeSeriesInsert { id, .. } => id,
        }
    }
}

/// One document whose write failed inside an otherwise-successful bulk call.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkItemFailure {
    pub id: String,
    pub reason: String,
}

/// Outcome of one or more bulk calls.
///
/// Job-level failures surface as errors; item-level failures are collected
/// here so callers can fail loud instead of silently dropping entities.
#[derive(Debug, Clone, Default)]
pub struct BulkSummary {
    /// Total operations submitted.
    pub total: usize,
    /// Operations acknowledged by the index.
    pub succeeded: usize,
    /// Per-item failures, `(id, reason)` pairs.
    pub failures: Vec<BulkItemFailure>,
}

impl BulkSummary {
    /// Fold another summary into this one.
    pub fn merge(&mut self, other: BulkSummary) {
        self.total += other.total;
        self.succeeded += other.succeeded;
        self.failures.extend(other.failures);
    }
}
