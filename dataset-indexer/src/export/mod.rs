//! Sample snapshot export.
//!
//! After all tables are loaded, the entity index is scanned and every nested
//! sample record is flattened into one row of a JSON snapshot written to
//! object storage. Downstream consumers get the folded view without speaking
//! the search engine's query language.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{info, instrument};

use dataset_indexer_repository::{ObjectStoreProvider, SearchIndexProvider};

use crate::errors::PipelineError;

/// Destination of the sample snapshot.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub bucket: String,
    pub object: String,
}

/// Builds the flattened sample snapshot from the entity index.
pub struct SampleExportBuilder {
    search: Arc<dyn SearchIndexProvider>,
    store: Arc<dyn ObjectStoreProvider>,
}

impl SampleExportBuilder {
    pub fn new(search: Arc<dyn SearchIndexProvider>, store: Arc<dyn ObjectStoreProvider>) -> Self {
        Self { search, store }
    }

    /// Scans the index and writes the snapshot.
    ///
    /// Each sample element becomes one record carrying the owning entity's
    /// id plus the sample's fields with their table prefixes stripped.
    ///
    /// # Returns
    /// The number of sample records written.
    #[instrument(skip(self, config), fields(index = index, bucket = %config.bucket))]
    pub async fn build(
        &self,
        index: &str,
        entity_id_column: &str,
        config: &ExportConfig,
    ) -> Result<usize, PipelineError> {
        let documents = self.search.scan_all(index).await?;

        let mut records = Vec::new();
        for (entity_id, source) in documents {
            let Some(samples) = source.get("samples").and_then(Value::as_array) else {
                continue;
            };
            for sample in samples {
                let Value::Object(fields) = sample else {
                    continue;
                };
                let mut flat = Map::new();
                flat.insert(
                    entity_id_column.to_string(),
                    Value::String(entity_id.clone()),
                );
                for (key, value) in fields {
                    flat.insert(bare_field_name(key).to_string(), value.clone());
                }
                records.push(Value::Object(flat));
            }
        }

        let body = serde_json::to_string_pretty(&records)
            .map_err(|err| PipelineError::export(format!("Snapshot serialization: {err}")))?;
        self.store.ensure_bucket(&config.bucket).await?;
        self.store
            .write_text(&config.bucket, &config.object, &body)
            .await?;

        info!(samples = records.len(), object = %config.object, "Sample snapshot written");
        Ok(records.len())
    }
}

/// Strips the qualified table prefix from a sample field name. Synthetic and
/// bare fields pass through.
fn bare_field_name(key: &str) -> &str {
    key.rsplit('.').next().unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataset_indexer_repository::{
        FsObjectStore, InMemoryIndex, IndexOperation, SearchIndexProvider,
    };
    use serde_json::json;

    #[test]
    fn strips_table_prefixes_only() {
        assert_eq!(bare_field_name("proj.ds.samples.assay"), "assay");
        assert_eq!(bare_field_name("sample_id"), "sample_id");
        assert_eq!(bare_field_name("_has_cram"), "_has_cram");
    }

    #[tokio::test]
    async fn flattens_samples_into_snapshot_records() {
        let index = Arc::new(InMemoryIndex::new());
        let mut element = Map::new();
        element.insert("sample_id".to_string(), json!("x1"));
        element.insert("proj.ds.samples.assay".to_string(), json!("rna"));
        element.insert("_has_cram".to_string(), json!(true));
        index
            .bulk(
                "dataset",
                &[
                    IndexOperation::ArrayMerge {
                        id: "p1".to_string(),
                        array_field: "samples".to_string(),
                        key_column: "sample_id".to_string(),
                        element,
                    },
                    // Entity without samples is skipped by the export.
                    IndexOperation::Upsert {
                        id: "p2".to_string(),
                        doc: {
                            let mut doc = Map::new();
                            doc.insert("t.age".to_string(), json!(50));
                            doc
                        },
                    },
                ],
            )
            .await
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsObjectStore::new(dir.path()));
        let builder = SampleExportBuilder::new(index, store.clone());

        let written = builder
            .build(
                "dataset",
                "participant_id",
                &ExportConfig {
                    bucket: "exports".to_string(),
                    object: "samples.json".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(written, 1);

        let body = store.read_text("exports", "samples.json").await.unwrap();
        let records: Vec<Value> = serde_json::from_str(&body).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["participant_id"], json!("p1"));
        assert_eq!(records[0]["sample_id"], json!("x1"));
        assert_eq!(records[0]["assay"], json!("rna"));
        assert_eq!(records[0]["_has_cram"], json!(true));
    }
}
