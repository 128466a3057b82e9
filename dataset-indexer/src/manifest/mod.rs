//! CSV file manifest ingestion.
//!
//! A manifest is a delimited file in object storage listing released file
//! artifacts per entity. Each row merges into the entity document's `files`
//! array keyed on the manifest's file key column, so re-running a manifest
//! load updates rows in place instead of appending duplicates.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{info, instrument};

use dataset_indexer_repository::{IndexOperation, ObjectStoreProvider};
use dataset_indexer_shared::ManifestConfig;

use crate::errors::PipelineError;

/// Reads manifests from object storage and turns their rows into index
/// operations.
pub struct ManifestIndexer {
    store: Arc<dyn ObjectStoreProvider>,
}

impl ManifestIndexer {
    pub fn new(store: Arc<dyn ObjectStoreProvider>) -> Self {
        Self { store }
    }

    /// Fetches one manifest and parses it into `files` array merges.
    #[instrument(skip(self), fields(manifest = %manifest.name))]
    pub async fn operations(
        &self,
        manifest: &ManifestConfig,
    ) -> Result<Vec<IndexOperation>, PipelineError> {
        let contents = self
            .store
            .read_text(&manifest.bucket, &manifest.object)
            .await?;
        let operations = parse_manifest(manifest, &contents)?;
        info!(rows = operations.len(), "Manifest parsed");
        Ok(operations)
    }
}

/// Parses manifest text into one array-merge operation per row.
///
/// Every row must carry a non-empty entity id and file key; a manifest that
/// cannot attribute a file to an entity is a release defect, not a row to
/// skip.
pub fn parse_manifest(
    config: &ManifestConfig,
    contents: &str,
) -> Result<Vec<IndexOperation>, PipelineError> {
    let delimiter = delimiter_byte(config)?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(false)
        .from_reader(contents.as_bytes());

    let headers = reader
        .headers()
        .map_err(|err| PipelineError::manifest(format!("Manifest {}: {err}", config.name)))?
        .clone();
    let primary_idx = column_index(config, &headers, &config.primary_key)?;
    let file_key_idx = column_index(config, &headers, &config.file_key_column)?;

    let mut operations = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record
            .map_err(|err| PipelineError::manifest(format!("Manifest {}: {err}", config.name)))?;

        let entity_id = record.get(primary_idx).unwrap_or_default().trim();
        if entity_id.is_empty() {
            return Err(PipelineError::manifest(format!(
                "Manifest {} row {}: empty value in primary key column {}",
                config.name,
                line + 1,
                config.primary_key
            )));
        }
        let file_key = record.get(file_key_idx).unwrap_or_default().trim();
        if file_key.is_empty() {
            return Err(PipelineError::manifest(format!(
                "Manifest {} row {}: empty value in file key column {}",
                config.name,
                line + 1,
                config.file_key_column
            )));
        }

        let mut element = Map::new();
        for (idx, value) in record.iter().enumerate() {
            if idx == primary_idx || value.trim().is_empty() {
                continue;
            }
            let header = headers.get(idx).unwrap_or_default();
            let key = if idx == file_key_idx {
                header.to_string()
            } else {
                format!("{}.{}", config.name, header)
            };
            element.insert(key, Value::String(value.to_string()));
        }

        operations.push(IndexOperation::ArrayMerge {
            id: entity_id.to_string(),
            array_field: "files".to_string(),
            key_column: config.file_key_column.clone(),
            element,
        });
    }

    Ok(operations)
}

/// Mapping fragment declaring the `files` array fields seen in a parsed
/// manifest. Needed because the entity index never infers types at write
/// time; every CSV cell indexes as text with a keyword subfield.
pub fn manifest_mapping(operations: &[IndexOperation]) -> Value {
    let mut properties = Map::new();
    for operation in operations {
        if let IndexOperation::ArrayMerge { element, .. } = operation {
            for key in element.keys() {
                properties.entry(key.clone()).or_insert_with(|| {
                    serde_json::json!({
                        "type": "text",
                        "fields": { "keyword": { "type": "keyword", "ignore_above": 256 } }
                    })
                });
            }
        }
    }
    serde_json::json!({
        "properties": {
            "files": { "type": "nested", "properties": properties }
        }
    })
}

fn delimiter_byte(config: &ManifestConfig) -> Result<u8, PipelineError> {
    let mut bytes = config.delimiter.bytes();
    match (bytes.next(), bytes.next()) {
        (Some(b), None) => Ok(b),
        _ => Err(PipelineError::config(format!(
            "Manifest {}: delimiter must be a single byte, got {:?}",
            config.name, config.delimiter
        ))),
    }
}

fn column_index(
    config: &ManifestConfig,
    headers: &csv::StringRecord,
    column: &str,
) -> Result<usize, PipelineError> {
    headers.iter().position(|h| h == column).ok_or_else(|| {
        PipelineError::config(format!(
            "Manifest {} has no column {column}",
            config.name
        ))
    })
}
