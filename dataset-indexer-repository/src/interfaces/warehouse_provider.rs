//! Warehouse provider trait definition.
//!
//! The analytical warehouse is an external collaborator specified only by the
//! interface the indexer consumes: schema introspection, row iteration,
//! distinct-value discovery for time-series pivots, and a bulk
//! export-to-storage job with a completion/timeout contract.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

use dataset_indexer_shared::{Row, TableSchema};

use crate::errors::WarehouseError;

/// Stream of rows from one table. Streaming keeps memory bounded for large
/// tables; the loader batches downstream.
pub type RowStream = BoxStream<'static, Result<Row, WarehouseError>>;

/// Abstracts the analytical warehouse backing a dataset.
#[async_trait]
pub trait WarehouseProvider: Send + Sync {
    /// Introspect the ordered field list of a table.
    async fn table_schema(&self, table: &str) -> Result<TableSchema, WarehouseError>;

    /// Iterate every row of a table.
    async fn scan_rows(&self, table: &str) -> Result<RowStream, WarehouseError>;

    /// Distinct non-null values of one column, used to discover time-series
    /// pivot keys before any row is projected.
    async fn distinct_values(
        &self,
        table: &str,
        column: &str,
    ) -> Result<Vec<Value>, WarehouseError>;

    /// Export a table to object storage under the given bucket/prefix,
    /// waiting for the job to complete. Fatal on job failure or timeout.
    async fn export_to_storage(
        &self,
        table: &str,
        bucket: &str,
        prefix: &str,
    ) -> Result<(), WarehouseError>;
}
