//! Pipeline orchestration.
//!
//! Tables are processed strictly in their configured order, each one fully
//! loaded before the next starts. Order is semantic for plain upserts, where
//! the last table writing a field wins. Manifests follow the tables, and the
//! optional sample snapshot export runs last over the fully folded index.

use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use tracing::{info, instrument};

use dataset_indexer_repository::opensearch::{entity_index_body, fields_index_body};
use dataset_indexer_repository::{
    IndexConfig, IndexOperation, ObjectStoreProvider, SearchIndexProvider, WarehouseProvider,
};
use dataset_indexer_shared::{DatasetConfig, ManifestConfig};
use serde_json::{Map, Value};

use crate::errors::PipelineError;
use crate::export::{ExportConfig, SampleExportBuilder};
use crate::loader::{BulkLoader, OperationStream};
use crate::manifest::ManifestIndexer;
use crate::mapping::{translate_table, TableContext};
use crate::processor::{MergeStrategy, TableProcessor};

/// Runs one dataset load end to end.
pub struct DatasetOrchestrator {
    dataset: DatasetConfig,
    index_config: IndexConfig,
    warehouse: Arc<dyn WarehouseProvider>,
    search: Arc<dyn SearchIndexProvider>,
    store: Arc<dyn ObjectStoreProvider>,
    loader: BulkLoader,
    export: Option<ExportConfig>,
}

impl DatasetOrchestrator {
    pub fn new(
        dataset: DatasetConfig,
        warehouse: Arc<dyn WarehouseProvider>,
        search: Arc<dyn SearchIndexProvider>,
        store: Arc<dyn ObjectStoreProvider>,
        loader: BulkLoader,
        export: Option<ExportConfig>,
    ) -> Self {
        let index_config = IndexConfig::from_dataset_name(&dataset.name);
        Self {
            dataset,
            index_config,
            warehouse,
            search,
            store,
            loader,
            export,
        }
    }

    /// Sanitized entity index name this load writes to.
    pub fn index_name(&self) -> &str {
        &self.index_config.name
    }

    /// Runs the full pipeline: bootstrap, tables in order, manifests, export.
    #[instrument(skip(self), fields(dataset = %self.dataset.name))]
    pub async fn run(&self) -> Result<(), PipelineError> {
        let started = Instant::now();
        self.search.wait_until_healthy().await?;
        self.bootstrap_indexes().await?;

        for table in &self.dataset.tables {
            self.index_table(table).await?;
        }

        for manifest in &self.dataset.manifest_files {
            self.index_manifest(manifest).await?;
        }

        if let Some(export) = &self.export {
            let builder =
                SampleExportBuilder::new(Arc::clone(&self.search), Arc::clone(&self.store));
            builder
                .build(&self.index_config.name, &self.dataset.primary_key, export)
                .await?;
        }

        info!(
            index = %self.index_config.name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Dataset load complete"
        );
        Ok(())
    }

    async fn bootstrap_indexes(&self) -> Result<(), PipelineError> {
        if self.dataset.recreate_index {
            info!(index = %self.index_config.name, "Recreating indexes");
            self.search
                .recreate_index(&self.index_config.name, &entity_index_body())
                .await?;
            self.search
                .recreate_index(&self.index_config.fields_name, &fields_index_body())
                .await?;
        } else {
            self.search
                .ensure_index_exists(&self.index_config.name, &entity_index_body())
                .await?;
            self.search
                .ensure_index_exists(&self.index_config.fields_name, &fields_index_body())
                .await?;
        }
        Ok(())
    }

    #[instrument(skip(self), fields(table = table))]
    async fn index_table(&self, table: &str) -> Result<(), PipelineError> {
        let started = Instant::now();
        let schema = self.warehouse.table_schema(table).await?;
        // Validation happens before any mapping or document write.
        let processor = TableProcessor::new(&schema, &self.dataset, table)?;

        let pivot_keys = match processor.strategy() {
            MergeStrategy::TimeSeries { pivot_column } => {
                let values = self.warehouse.distinct_values(table, pivot_column).await?;
                Some(
                    values
                        .iter()
                        .map(crate::mapping::pivot_bucket_key)
                        .collect::<Vec<_>>(),
                )
            }
            _ => None,
        };

        let ctx = TableContext {
            table,
            entity_id_column: &self.dataset.primary_key,
            sample_id_column: self.dataset.sample_id_column.as_deref(),
            artifact_columns: &self.dataset.sample_file_columns,
            time_series_column: self.dataset.time_series_column.as_deref(),
        };
        let translated = translate_table(&schema, &ctx, pivot_keys.as_deref())?;

        self.search
            .put_mapping(&self.index_config.name, &translated.mapping)
            .await?;
        self.register_fields(&translated.registry).await?;

        let rows = self.warehouse.scan_rows(table).await?;
        let operations: OperationStream = rows
            .map(move |row| match row {
                Ok(row) => processor.process_row(&row),
                Err(err) => Err(err.into()),
            })
            .boxed();
        let summary = self.loader.run(&self.index_config.name, operations).await?;

        info!(
            documents = summary.total,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Table indexed"
        );
        Ok(())
    }

    /// Upserts the table's registry entries into the sibling fields index.
    async fn register_fields(
        &self,
        registry: &[dataset_indexer_shared::FieldRegistryEntry],
    ) -> Result<(), PipelineError> {
        if registry.is_empty() {
            return Ok(());
        }

        let mut operations = Vec::with_capacity(registry.len());
        for entry in registry {
            let mut doc = Map::new();
            doc.insert("name".to_string(), Value::String(entry.name.clone()));
            if let Some(description) = &entry.description {
                doc.insert(
                    "description".to_string(),
                    Value::String(description.clone()),
                );
            }
            operations.push(IndexOperation::Upsert {
                id: entry.id.clone(),
                doc,
            });
        }

        let summary = self
            .search
            .bulk(&self.index_config.fields_name, &operations)
            .await?;
        if !summary.failures.is_empty() {
            return Err(PipelineError::loader(format!(
                "{} of {} field registry entries failed against index {}",
                summary.failures.len(),
                summary.total,
                self.index_config.fields_name
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, manifest), fields(manifest = %manifest.name))]
    async fn index_manifest(&self, manifest: &ManifestConfig) -> Result<(), PipelineError> {
        let indexer = ManifestIndexer::new(Arc::clone(&self.store));
        let operations = indexer.operations(manifest).await?;
        let count = operations.len();

        self.search
            .put_mapping(
                &self.index_config.name,
                &crate::manifest::manifest_mapping(&operations),
            )
            .await?;

        let stream: OperationStream =
            futures::stream::iter(operations.into_iter().map(Ok)).boxed();
        self.loader.run(&self.index_config.name, stream).await?;

        info!(files = count, "Manifest indexed");
        Ok(())
    }
}
