//! This module defines the core data structures and types used across the
//! dataset indexer. It re-exports the warehouse schema, dataset configuration,
//! row, and field registry types.

pub mod dataset_config;
pub mod field_registry;
pub mod row;
pub mod table_schema;

pub use dataset_config::{DatasetConfig, ManifestConfig};
pub use field_registry::FieldRegistryEntry;
pub use row::Row;
pub use table_schema::{FieldMode, FieldType, SchemaField, TableSchema};
