//! Search index error types.
//!
//! This module defines the unified error type for all search index
//! operations, covering backend errors (connection, bulk calls, settings) and
//! validation errors raised before anything is written.

use thiserror::Error;

/// Unified errors from search index operations.
#[derive(Debug, Clone, Error)]
pub enum SearchIndexError {
    /// Validation error (e.g. unsafe script identifiers, empty batches).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Failed to establish a connection to the search index backend.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The cluster never reported a healthy state within the overall timeout.
    #[error("Cluster health error: {0}")]
    ClusterHealthError(String),

    /// Failed to create or delete the search index.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// Failed to apply an index mapping.
    #[error("Mapping error: {0}")]
    MappingError(String),

    /// Failed to apply index settings.
    #[error("Settings error: {0}")]
    SettingsError(String),

    /// A bulk call failed as a whole (connectivity loss, rejected request).
    #[error("Bulk error: {0}")]
    BulkError(String),

    /// Failed to scan documents out of the index.
    #[error("Scan error: {0}")]
    ScanError(String),

    /// Failed to parse a response from the search index backend.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to serialize data for the search index backend.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The provider's internal state is no longer trustworthy.
    #[error("State error: {0}")]
    StateError(String),
}

impl SearchIndexError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a cluster health error.
    pub fn cluster_health(msg: impl Into<String>) -> Self {
        Self::ClusterHealthError(msg.into())
    }

    /// Create an index creation error.
    pub fn index_creation(msg: impl Into<String>) -> Self {
        Self::IndexCreationError(msg.into())
    }

    /// Create a mapping error.
    pub fn mapping(msg: impl Into<String>) -> Self {
        Self::MappingError(msg.into())
    }

    /// Create a settings error.
    pub fn settings(msg: impl Into<String>) -> Self {
        Self::SettingsError(msg.into())
    }

    /// Create a bulk error.
    pub fn bulk(msg: impl Into<String>) -> Self {
        Self::BulkError(msg.into())
    }

    /// Create a scan error.
    pub fn scan(msg: impl Into<String>) -> Self {
        Self::ScanError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Create a state error.
    pub fn state(msg: impl Into<String>) -> Self {
        Self::StateError(msg.into())
    }
}
