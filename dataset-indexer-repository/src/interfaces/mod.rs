//! Collaborator trait definitions.

pub mod object_store_provider;
pub mod search_index_provider;
pub mod warehouse_provider;

pub use object_store_provider::ObjectStoreProvider;
pub use search_index_provider::SearchIndexProvider;
pub use warehouse_provider::{RowStream, WarehouseProvider};
