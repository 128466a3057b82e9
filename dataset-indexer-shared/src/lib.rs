//! # Dataset Indexer Shared
//!
//! This crate defines shared data structures and types used across the dataset
//! indexer ecosystem. It includes warehouse table schemas, row values, dataset
//! configuration, and field registry entries.

pub mod types;

pub use types::dataset_config::{DatasetConfig, ManifestConfig};
pub use types::field_registry::FieldRegistryEntry;
pub use types::row::{is_missing, Row};
pub use types::table_schema::{FieldMode, FieldType, SchemaField, TableSchema, UnknownFieldType};
