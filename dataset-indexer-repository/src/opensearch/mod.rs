//! OpenSearch implementation of the search index provider.

pub mod index_config;
pub mod provider;
pub mod scripts;

pub use index_config::{
    entity_index_body, fields_index_body, read_optimized_settings, write_optimized_settings,
    IndexConfig, DEFAULT_TOTAL_FIELDS_LIMIT,
};
pub use provider::{OpenSearchConfig, OpenSearchProvider};
