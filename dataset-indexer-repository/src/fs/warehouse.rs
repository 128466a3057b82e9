//! Flat-file warehouse.
//!
//! Tables live under a root directory as `<table>.schema.json` (the ordered
//! field list, warehouse type tags included) and `<table>.ndjson` (one JSON
//! object per row). Table names may be dataset-qualified; path separators are
//! not allowed in them.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream;
use serde_json::Value;
use tokio::fs;
use tracing::{debug, info};

use dataset_indexer_shared::{Row, SchemaField, TableSchema};

use crate::errors::{ObjectStoreError, WarehouseError};
use crate::interfaces::{ObjectStoreProvider, RowStream, WarehouseProvider};

/// Warehouse backed by flat files on local disk.
pub struct FileWarehouse {
    root: PathBuf,
    /// Destination for export jobs.
    store: Arc<dyn ObjectStoreProvider>,
}

impl FileWarehouse {
    pub fn new(root: impl Into<PathBuf>, store: Arc<dyn ObjectStoreProvider>) -> Self {
        Self {
            root: root.into(),
            store,
        }
    }

    fn table_file(&self, table: &str, suffix: &str) -> Result<PathBuf, WarehouseError> {
        if table.contains('/') || table.contains('\\') {
            return Err(WarehouseError::schema(format!(
                "Table name '{}' contains path separators",
                table
            )));
        }
        Ok(self.root.join(format!("{}.{}", table, suffix)))
    }

    async fn read_table_file(&self, table: &str, suffix: &str) -> Result<String, WarehouseError> {
        let path = self.table_file(table, suffix)?;
        match fs::read_to_string(&path).await {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(WarehouseError::TableNotFound(table.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Parse every row of a table eagerly. The trait surface stays a stream
    /// so hosted backends can page; the flat-file backend is small enough to
    /// read whole.
    async fn read_rows(&self, table: &str) -> Result<Vec<Row>, WarehouseError> {
        let contents = self.read_table_file(table, "ndjson").await?;
        let mut rows = Vec::new();

        for (line_no, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let row: Row = serde_json::from_str(line).map_err(|e| {
                WarehouseError::row(format!("{} line {}: {}", table, line_no + 1, e))
            })?;
            rows.push(row);
        }

        debug!(table = %table, rows = rows.len(), "Read table rows");
        Ok(rows)
    }
}

#[async_trait]
impl WarehouseProvider for FileWarehouse {
    async fn table_schema(&self, table: &str) -> Result<TableSchema, WarehouseError> {
        let contents = self.read_table_file(table, "schema.json").await?;
        let fields: Vec<SchemaField> = serde_json::from_str(&contents)
            .map_err(|e| WarehouseError::schema(format!("{}: {}", table, e)))?;
        Ok(TableSchema::new(fields))
    }

    async fn scan_rows(&self, table: &str) -> Result<RowStream, WarehouseError> {
        let rows = self.read_rows(table).await?;
        Ok(Box::pin(stream::iter(rows.into_iter().map(Ok))))
    }

    async fn distinct_values(
        &self,
        table: &str,
        column: &str,
    ) -> Result<Vec<Value>, WarehouseError> {
        let rows = self.read_rows(table).await?;
        let mut seen = Vec::new();
        for row in rows {
            if let Some(value) = row.get(column) {
                if !value.is_null() && !seen.contains(value) {
                    seen.push(value.clone());
                }
            }
        }
        Ok(seen)
    }

    async fn export_to_storage(
        &self,
        table: &str,
        bucket: &str,
        prefix: &str,
    ) -> Result<(), WarehouseError> {
        let contents = self.read_table_file(table, "ndjson").await?;
        let object = format!("{}/{}-000000000000.ndjson", prefix, table);

        self.store
            .ensure_bucket(bucket)
            .await
            .map_err(|e: ObjectStoreError| WarehouseError::export(e.to_string()))?;
        self.store
            .write_text(bucket, &object, &contents)
            .await
            .map_err(|e: ObjectStoreError| WarehouseError::export(e.to_string()))?;

        info!(table = %table, bucket = %bucket, object = %object, "Exported table shard");
        Ok(())
    }
}
