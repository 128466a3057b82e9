use dataset_indexer_repository::{ObjectStoreError, SearchIndexError, WarehouseError};
use thiserror::Error;

/// Errors produced while running the indexing pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Warehouse error: {0}")]
    Warehouse(#[from] WarehouseError),

    #[error("Object storage error: {0}")]
    ObjectStore(#[from] ObjectStoreError),

    #[error("Search index error: {0}")]
    SearchIndex(#[from] SearchIndexError),

    #[error("Loader error: {0}")]
    LoaderError(String),

    #[error("Manifest error: {0}")]
    ManifestError(String),

    #[error("Export error: {0}")]
    ExportError(String),
}

impl PipelineError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn loader(msg: impl Into<String>) -> Self {
        Self::LoaderError(msg.into())
    }

    pub fn manifest(msg: impl Into<String>) -> Self {
        Self::ManifestError(msg.into())
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::ExportError(msg.into())
    }
}
