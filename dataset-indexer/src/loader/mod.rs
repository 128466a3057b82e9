//! Parallel bulk loader.
//!
//! Operations are hash-partitioned by document id across a fixed pool of
//! workers, so all writes for one entity land on the same worker in stream
//! order and no cross-worker coordination is needed. The whole load runs
//! inside a write-optimized/read-optimized settings bracket; the read-side
//! settings are restored even when the load fails.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, error, instrument};

use dataset_indexer_repository::opensearch::{
    read_optimized_settings, write_optimized_settings, DEFAULT_TOTAL_FIELDS_LIMIT,
};
use dataset_indexer_repository::{BulkSummary, IndexOperation, SearchIndexProvider};

use crate::errors::PipelineError;

/// Stream of operations feeding one load.
pub type OperationStream = BoxStream<'static, Result<IndexOperation, PipelineError>>;

/// Tuning knobs for one bulk load.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Parallel bulk workers.
    pub workers: usize,
    /// Operations per bulk request.
    pub batch_size: usize,
    /// Ceiling for the per-index mapped field count during the load.
    pub total_fields_limit: u32,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            batch_size: 500,
            total_fields_limit: DEFAULT_TOTAL_FIELDS_LIMIT,
        }
    }
}

/// Drives a stream of index operations through the search index provider.
pub struct BulkLoader {
    provider: Arc<dyn SearchIndexProvider>,
    config: LoaderConfig,
}

impl BulkLoader {
    pub fn new(provider: Arc<dyn SearchIndexProvider>) -> Self {
        Self::with_config(provider, LoaderConfig::default())
    }

    pub fn with_config(provider: Arc<dyn SearchIndexProvider>, config: LoaderConfig) -> Self {
        Self { provider, config }
    }

    /// Runs one load to completion.
    ///
    /// Item-level failures are collected across workers and turn the whole
    /// load into an error once the read-optimized settings are back in
    /// place. A partially indexed dataset must never look like a success.
    ///
    /// # Arguments
    /// * `index` - Entity index receiving the operations.
    /// * `operations` - The operation stream to drain.
    ///
    /// # Returns
    /// The merged bulk summary, or the first error encountered.
    #[instrument(skip(self, operations), fields(index = index))]
    pub async fn run(
        &self,
        index: &str,
        operations: OperationStream,
    ) -> Result<BulkSummary, PipelineError> {
        self.provider
            .put_settings(index, &write_optimized_settings(self.config.total_fields_limit))
            .await?;

        let outcome = self.execute(index, operations).await;

        // Restore read-side settings before surfacing any load error.
        let restored = self
            .provider
            .put_settings(index, &read_optimized_settings())
            .await;

        let summary = outcome?;
        restored?;

        if !summary.failures.is_empty() {
            for failure in &summary.failures {
                error!(id = %failure.id, reason = %failure.reason, "Document failed to index");
            }
            return Err(PipelineError::loader(format!(
                "{} of {} operations failed against index {}",
                summary.failures.len(),
                summary.total,
                index
            )));
        }

        debug!(total = summary.total, "Bulk load complete");
        Ok(summary)
    }

    async fn execute(
        &self,
        index: &str,
        mut operations: OperationStream,
    ) -> Result<BulkSummary, PipelineError> {
        let worker_count = self.config.workers.max(1);
        let batch_size = self.config.batch_size.max(1);

        let mut senders = Vec::with_capacity(worker_count);
        let mut handles = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let (tx, rx) = mpsc::channel::<IndexOperation>(batch_size * 2);
            senders.push(tx);
            handles.push(tokio::spawn(Self::worker(
                Arc::clone(&self.provider),
                index.to_string(),
                batch_size,
                rx,
            )));
        }

        let mut stream_error = None;
        while let Some(operation) = operations.next().await {
            match operation {
                Ok(operation) => {
                    let shard = Self::shard_for(operation.id(), worker_count);
                    // A send error means the worker bailed; its join result
                    // carries the real error.
                    if senders[shard].send(operation).await.is_err() {
                        break;
                    }
                }
                Err(err) => {
                    stream_error = Some(err);
                    break;
                }
            }
        }
        drop(senders);

        let mut summary = BulkSummary::default();
        let mut worker_error = None;
        for handle in handles {
            match handle.await {
                Ok(Ok(worker_summary)) => summary.merge(worker_summary),
                Ok(Err(err)) => worker_error = Some(err),
                Err(join_err) => {
                    worker_error = Some(PipelineError::loader(format!(
                        "Bulk worker panicked: {join_err}"
                    )))
                }
            }
        }

        if let Some(err) = stream_error {
            return Err(err);
        }
        if let Some(err) = worker_error {
            return Err(err);
        }
        Ok(summary)
    }

    async fn worker(
        provider: Arc<dyn SearchIndexProvider>,
        index: String,
        batch_size: usize,
        mut operations: mpsc::Receiver<IndexOperation>,
    ) -> Result<BulkSummary, PipelineError> {
        let mut summary = BulkSummary::default();
        let mut batch = Vec::with_capacity(batch_size);

        while let Some(operation) = operations.recv().await {
            batch.push(operation);
            if batch.len() >= batch_size {
                summary.merge(provider.bulk(&index, &batch).await?);
                batch.clear();
            }
        }
        if !batch.is_empty() {
            summary.merge(provider.bulk(&index, &batch).await?);
        }

        Ok(summary)
    }

    fn shard_for(id: &str, worker_count: usize) -> usize {
        let mut hasher = DefaultHasher::new();
        id.hash(&mut hasher);
        (hasher.finish() as usize) % worker_count
    }
}
