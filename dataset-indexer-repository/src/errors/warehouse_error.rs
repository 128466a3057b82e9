//! Warehouse collaborator error types.

use dataset_indexer_shared::UnknownFieldType;
use thiserror::Error;

/// Errors from warehouse schema introspection, row iteration, and export
/// jobs.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// The requested table does not exist.
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Failed to read or parse a table schema.
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// A schema carried a type tag the indexer does not recognize. Fatal
    /// configuration error, raised before any write.
    #[error(transparent)]
    UnknownFieldType(#[from] UnknownFieldType),

    /// Failed to read or decode a row.
    #[error("Row error: {0}")]
    RowError(String),

    /// A bulk extraction/export job failed or timed out.
    #[error("Export job error: {0}")]
    ExportError(String),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl WarehouseError {
    /// Create a schema error.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::SchemaError(msg.into())
    }

    /// Create a row error.
    pub fn row(msg: impl Into<String>) -> Self {
        Self::RowError(msg.into())
    }

    /// Create an export job error.
    pub fn export(msg: impl Into<String>) -> Self {
        Self::ExportError(msg.into())
    }
}
