//! # Dataset Indexer
//!
//! Schema-driven indexer that folds analytical warehouse tables into
//! per-participant documents in a search index. Every table row becomes a
//! partial update against its entity's document, so a participant's clinical
//! attributes, nested sample records and released file artifacts all land in
//! one searchable document.
//!
//! ## Architecture
//!
//! One dataset load runs as a single pipeline:
//!
//! 1. **Mapping**: Translates each table schema into index mappings and
//!    field registry entries
//! 2. **Processor**: Projects rows into merge operations (plain upsert,
//!    sample array merge, or time-series pivot)
//! 3. **Loader**: Drives operations through hash-partitioned bulk workers
//! 4. **Orchestrator**: Coordinates tables, manifests and the export pass
//!
//! ## Modules
//!
//! - [`config`]: Configuration and dependency initialization
//! - [`mapping`]: Schema to mapping/registry translation
//! - [`processor`]: Row projection and merge strategy selection
//! - [`loader`]: Parallel bulk loading with the settings bracket
//! - [`manifest`]: CSV file manifest ingestion
//! - [`export`]: Flattened sample snapshot export
//! - [`orchestrator`]: Coordinates the full load
//! - [`errors`]: Error types for the pipeline

pub mod config;
pub mod errors;
pub mod export;
pub mod loader;
pub mod manifest;
pub mod mapping;
pub mod orchestrator;
pub mod processor;

pub use config::Dependencies;
pub use errors::PipelineError;

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    PipelineError(#[from] PipelineError),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
