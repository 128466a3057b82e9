//! Error types for the dataset indexer collaborators.

pub mod object_store_error;
pub mod search_index_error;
pub mod warehouse_error;

pub use object_store_error::ObjectStoreError;
pub use search_index_error::SearchIndexError;
pub use warehouse_error::WarehouseError;
