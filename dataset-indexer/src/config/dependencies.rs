//! Dependency initialization and wiring for the dataset indexer.

use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use dataset_indexer_repository::opensearch::OpenSearchConfig;
use dataset_indexer_repository::{FileWarehouse, FsObjectStore, OpenSearchProvider};
use dataset_indexer_shared::DatasetConfig;

use crate::export::ExportConfig;
use crate::loader::{BulkLoader, LoaderConfig};
use crate::orchestrator::DatasetOrchestrator;
use crate::IndexingError;

/// Default search engine URL.
const DEFAULT_SEARCH_URL: &str = "http://localhost:9200";

/// Default warehouse data directory.
const DEFAULT_WAREHOUSE_DIR: &str = "data";

/// Default object storage root directory.
const DEFAULT_OBJECT_STORE_DIR: &str = "objects";

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: DatasetOrchestrator,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `DATASET_CONFIG`: Path to the dataset configuration JSON (required)
    /// - `SEARCH_URL`: Search engine URL (default: http://localhost:9200)
    /// - `WAREHOUSE_DIR`: Warehouse data directory (default: "data")
    /// - `OBJECT_STORE_DIR`: Object storage root (default: "objects")
    /// - `INDEX_WORKERS`: Parallel bulk workers (default: 4)
    /// - `BULK_BATCH_SIZE`: Operations per bulk request (default: 500)
    /// - `BULK_TIMEOUT_SECS`: Per-bulk-request timeout (default: 300)
    /// - `BULK_RETRY_ATTEMPTS`: Bulk send attempts before giving up (default: 3)
    /// - `HEALTH_TIMEOUT_SECS`: Cluster health wait ceiling (default: 120)
    /// - `TOTAL_FIELDS_LIMIT`: Mapped field ceiling during loads (default: 25000)
    /// - `EXPORT_BUCKET` / `EXPORT_OBJECT`: Sample snapshot destination
    ///   (export skipped unless both are set)
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If the dataset configuration is missing or invalid
    pub async fn new() -> Result<Self, IndexingError> {
        let config_path = env::var("DATASET_CONFIG")
            .map_err(|_| IndexingError::config("DATASET_CONFIG must be set"))?;
        let search_url =
            env::var("SEARCH_URL").unwrap_or_else(|_| DEFAULT_SEARCH_URL.to_string());
        let warehouse_dir =
            env::var("WAREHOUSE_DIR").unwrap_or_else(|_| DEFAULT_WAREHOUSE_DIR.to_string());
        let object_store_dir =
            env::var("OBJECT_STORE_DIR").unwrap_or_else(|_| DEFAULT_OBJECT_STORE_DIR.to_string());

        let loader_defaults = LoaderConfig::default();
        let workers = env_parse("INDEX_WORKERS", loader_defaults.workers)?;
        let batch_size = env_parse("BULK_BATCH_SIZE", loader_defaults.batch_size)?;
        let total_fields_limit =
            env_parse("TOTAL_FIELDS_LIMIT", loader_defaults.total_fields_limit)?;

        let search_defaults = OpenSearchConfig::default();
        let bulk_timeout = Duration::from_secs(env_parse(
            "BULK_TIMEOUT_SECS",
            search_defaults.bulk_timeout.as_secs(),
        )?);
        let health_timeout = Duration::from_secs(env_parse(
            "HEALTH_TIMEOUT_SECS",
            search_defaults.health_timeout.as_secs(),
        )?);
        let bulk_retry_attempts =
            env_parse("BULK_RETRY_ATTEMPTS", search_defaults.bulk_retry_attempts)?;

        let export = match (env::var("EXPORT_BUCKET").ok(), env::var("EXPORT_OBJECT").ok()) {
            (Some(bucket), Some(object)) => Some(ExportConfig { bucket, object }),
            _ => None,
        };

        info!(
            config_path = %config_path,
            search_url = %search_url,
            warehouse_dir = %warehouse_dir,
            workers = workers,
            batch_size = batch_size,
            "Initializing dependencies"
        );

        let contents = tokio::fs::read_to_string(&config_path).await.map_err(|e| {
            IndexingError::config(format!("Cannot read dataset config {config_path}: {e}"))
        })?;
        let dataset: DatasetConfig = serde_json::from_str(&contents).map_err(|e| {
            IndexingError::config(format!("Invalid dataset config {config_path}: {e}"))
        })?;

        let store = Arc::new(FsObjectStore::new(&object_store_dir));
        let warehouse = Arc::new(FileWarehouse::new(&warehouse_dir, store.clone()));
        let search = Arc::new(
            OpenSearchProvider::new(
                &search_url,
                OpenSearchConfig {
                    bulk_timeout,
                    health_timeout,
                    bulk_retry_attempts,
                    ..search_defaults
                },
            )
            .map_err(|e| IndexingError::config(format!("Search connection setup: {e}")))?,
        );

        let loader = BulkLoader::with_config(
            search.clone(),
            LoaderConfig {
                workers,
                batch_size,
                total_fields_limit,
            },
        );

        let orchestrator =
            DatasetOrchestrator::new(dataset, warehouse, search, store, loader, export);

        Ok(Self { orchestrator })
    }
}

/// Parse an optional numeric environment variable. An unset variable falls
/// back to the default; a set-but-unparsable value is a configuration error,
/// not a silent fallback.
fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> Result<T, IndexingError> {
    match env::var(name) {
        Ok(raw) => raw.parse::<T>().map_err(|_| {
            IndexingError::config(format!("Invalid value for {name}: {raw:?}"))
        }),
        Err(_) => Ok(default),
    }
}
