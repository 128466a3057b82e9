//! # Dataset Indexer Repository
//!
//! This crate provides traits and implementations for the dataset indexer's
//! external collaborators: the document search index, the analytical
//! warehouse, and object storage. It includes definitions for errors,
//! interfaces, the concrete OpenSearch implementation, an in-memory search
//! index used by tests and dry runs, and filesystem-backed warehouse/storage
//! implementations for flat-file datasets.

pub mod errors;
pub mod fs;
pub mod interfaces;
pub mod memory;
pub mod opensearch;
pub mod types;
pub mod utils;

pub use errors::{ObjectStoreError, SearchIndexError, WarehouseError};
pub use fs::{FileWarehouse, FsObjectStore};
pub use interfaces::{ObjectStoreProvider, SearchIndexProvider, WarehouseProvider};
pub use memory::InMemoryIndex;
pub use opensearch::{IndexConfig, OpenSearchProvider};
pub use types::{BulkItemFailure, BulkSummary, IndexOperation};
pub use utils::convert_to_index_name;
