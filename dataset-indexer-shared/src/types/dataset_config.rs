//! Dataset configuration.
//!
//! Describes one dataset load: which warehouse tables to fold into the entity
//! index, which column joins rows to an entity, the optional secondary id that
//! nests sample records, the optional time-series pivot column, and any flat
//! file manifests. The configuration is owned by an external collaborator and
//! consumed here as a deserialized document; comment stripping and argument
//! parsing happen outside this crate.

use serde::Deserialize;
use std::collections::BTreeMap;

fn default_delimiter() -> String {
    ",".to_string()
}

/// One CSV file manifest stored in object storage.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ManifestConfig {
    /// Qualified name used to namespace the manifest's columns.
    pub name: String,
    /// Object storage bucket holding the manifest.
    pub bucket: String,
    /// Object path of the manifest within the bucket.
    pub object: String,
    /// Single-character column delimiter.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    /// Column holding the entity id.
    pub primary_key: String,
    /// Column identifying one file within an entity's `files` array. Rows with
    /// the same key merge field-by-field instead of appending duplicates.
    pub file_key_column: String,
}

/// Configuration for one dataset load.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatasetConfig {
    /// Dataset display name; sanitized into the index name.
    pub name: String,
    /// Column joining every table's rows to an entity document.
    pub primary_key: String,
    /// Secondary id column nesting rows under the entity's `samples` array.
    /// Tables without this column receive plain partial updates.
    #[serde(default)]
    pub sample_id_column: Option<String>,
    /// Tables to fold into the index, processed in this exact order.
    pub tables: Vec<String>,
    /// Artifact type to `<table>.<column>` source mapping. Each produces a
    /// synthetic `_has_<type>` boolean on sample records.
    #[serde(default)]
    pub sample_file_columns: BTreeMap<String, String>,
    /// Pivot column whose distinct values become time-series sub-keys.
    /// Mutually exclusive with `sample_id_column` on any one table.
    #[serde(default)]
    pub time_series_column: Option<String>,
    /// CSV manifests merged into per-entity `files` arrays.
    #[serde(default)]
    pub manifest_files: Vec<ManifestConfig>,
    /// Delete and recreate the index before loading. When false, a re-run
    /// merges into the existing documents.
    #[serde(default)]
    pub recreate_index: bool,
}
