//! Index configuration, settings and bootstrap bodies.
//!
//! One dataset load owns two indexes: the entity index (one document per
//! participant) and its sibling `<index>_fields` registry index. Both are
//! created with dynamic mapping disabled; on large datasets, write-time type
//! inference is a severe bulk-indexing cost, so every field is mapped
//! explicitly before rows flow.

use serde_json::{json, Value};

use crate::utils::convert_to_index_name;

/// Default ceiling for the per-index mapped field count. Wide datasets with
/// time-series pivots easily exceed the engine's 1000-field default.
pub const DEFAULT_TOTAL_FIELDS_LIMIT: u32 = 25_000;

/// Names of the index pair backing one dataset.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Entity index name, sanitized from the dataset display name.
    pub name: String,
    /// Sibling field registry index name.
    pub fields_name: String,
}

impl IndexConfig {
    /// Derive the index pair from a dataset display name.
    pub fn from_dataset_name(dataset_name: &str) -> Self {
        let name = convert_to_index_name(dataset_name);
        let fields_name = format!("{}_fields", name);
        Self { name, fields_name }
    }
}

/// Creation body for the entity index.
pub fn entity_index_body() -> Value {
    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 1
        },
        "mappings": {
            "dynamic": false
        }
    })
}

/// Creation body for the field registry index.
pub fn fields_index_body() -> Value {
    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 1
        },
        "mappings": {
            "dynamic": false,
            "properties": {
                "name": {
                    "type": "text",
                    "fields": { "keyword": { "type": "keyword" } }
                },
                "description": { "type": "text" }
            }
        }
    })
}

/// Settings applied for the duration of a bulk load: near-real-time refresh
/// off, replicas dropped, translog durability relaxed, field ceiling raised.
pub fn write_optimized_settings(total_fields_limit: u32) -> Value {
    json!({
        "index": {
            "refresh_interval": "-1",
            "number_of_replicas": 0,
            "translog.durability": "async",
            "mapping.total_fields.limit": total_fields_limit
        }
    })
}

/// Settings restored after the bulk load so the index is queryable again.
pub fn read_optimized_settings() -> Value {
    json!({
        "index": {
            "refresh_interval": "1s",
            "number_of_replicas": 1,
            "translog.durability": "request"
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_pair_from_dataset_name() {
        let config = IndexConfig::from_dataset_name("1000 Genomes");
        assert_eq!(config.name, "1000_genomes");
        assert_eq!(config.fields_name, "1000_genomes_fields");
    }

    #[test]
    fn test_entity_index_disables_dynamic_mapping() {
        let body = entity_index_body();
        assert_eq!(body["mappings"]["dynamic"], json!(false));
    }

    #[test]
    fn test_settings_bracket_round_trip() {
        let write = write_optimized_settings(DEFAULT_TOTAL_FIELDS_LIMIT);
        assert_eq!(write["index"]["refresh_interval"], json!("-1"));
        assert_eq!(write["index"]["number_of_replicas"], json!(0));
        assert_eq!(write["index"]["translog.durability"], json!("async"));
        assert_eq!(
            write["index"]["mapping.total_fields.limit"],
            json!(25_000)
        );

        let read = read_optimized_settings();
        assert_eq!(read["index"]["refresh_interval"], json!("1s"));
        assert_eq!(read["index"]["number_of_replicas"], json!(1));
    }

    #[test]
    fn test_fields_index_maps_registry_metadata() {
        let body = fields_index_body();
        assert_eq!(body["mappings"]["properties"]["name"]["type"], json!("text"));
        assert_eq!(
            body["mappings"]["properties"]["description"]["type"],
            json!("text")
        );
    }
}
