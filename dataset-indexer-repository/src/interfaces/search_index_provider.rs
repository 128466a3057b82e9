//! Search index provider trait definition.
//!
//! This module defines the abstract interface for search index operations,
//! allowing for different backend implementations (OpenSearch, in-memory for
//! tests and dry runs).

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::SearchIndexError;
use crate::types::{BulkSummary, IndexOperation};

/// Abstracts the underlying search index implementation.
///
/// Implementations are injected into the pipeline to enable dependency
/// injection and hermetic testing. Indexes are named per call because one
/// dataset load writes to two indexes: the entity index and its sibling
/// field registry index.
///
/// # Note on Document Creation
///
/// There is no separate create function. Every [`IndexOperation`] is an
/// upsert: the document is created by whichever table first references its
/// id and mutated by every later table touching the same id.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Block until the cluster reports a healthy state, polling at a fixed
    /// interval. Fatal after the implementation's overall timeout.
    async fn wait_until_healthy(&self) -> Result<(), SearchIndexError>;

    /// Create the index with the given settings/mappings body if it does not
    /// exist yet.
    async fn ensure_index_exists(&self, index: &str, body: &Value)
        -> Result<(), SearchIndexError>;

    /// Delete the index if present, then create it fresh with the given
    /// settings/mappings body.
    async fn recreate_index(&self, index: &str, body: &Value) -> Result<(), SearchIndexError>;

    /// Merge additional field mappings into the index. Must not enable
    /// write-time dynamic type inference.
    async fn put_mapping(&self, index: &str, mapping: &Value) -> Result<(), SearchIndexError>;

    /// Apply dynamic index settings. Used for the write-optimized /
    /// read-optimized settings bracket around bulk loads.
    async fn put_settings(&self, index: &str, settings: &Value) -> Result<(), SearchIndexError>;

    /// Execute a batch of upsert operations against one index.
    ///
    /// A job-level failure (whole request rejected, connectivity loss)
    /// returns `Err`. Item-level failures are reported in the summary so the
    /// caller can decide to fail loud.
    async fn bulk(
        &self,
        index: &str,
        operations: &[IndexOperation],
    ) -> Result<BulkSummary, SearchIndexError>;

    /// Scan every document in the index, returning `(document id, source)`
    /// pairs. Used by the export snapshot pass after all tables are loaded.
    async fn scan_all(&self, index: &str) -> Result<Vec<(String, Value)>, SearchIndexError>;
}
