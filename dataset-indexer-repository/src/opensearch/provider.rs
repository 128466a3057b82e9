//! OpenSearch provider implementation.
//!
//! This module provides the concrete implementation of `SearchIndexProvider`
//! using the OpenSearch Rust crate. Merge operations are translated into
//! parameterized Painless scripts executed atomically per document on the
//! server side.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use opensearch::cluster::ClusterHealthParts;
use opensearch::http::request::JsonBody;
use opensearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use opensearch::indices::{
    IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts, IndicesPutMappingParts,
    IndicesPutSettingsParts,
};
use opensearch::{BulkParts, ClearScrollParts, OpenSearch, ScrollParts, SearchParts};
use serde_json::{json, Value};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::opensearch::scripts;
use crate::types::{BulkItemFailure, BulkSummary, IndexOperation};

/// Scroll window kept open between scan pages.
const SCROLL_KEEPALIVE: &str = "2m";

/// Documents fetched per scroll page.
const SCROLL_PAGE_SIZE: usize = 500;

/// Tuning knobs for the OpenSearch provider.
///
/// The bulk timeout defaults to five minutes: per-row documents in wide
/// datasets can be large, and the engine's short default trips on them.
#[derive(Debug, Clone)]
pub struct OpenSearchConfig {
    /// Request timeout for bulk calls.
    pub bulk_timeout: Duration,
    /// Total attempts for a bulk call whose transport fails. Item-level
    /// failures and HTTP rejections are never retried.
    pub bulk_retry_attempts: u32,
    /// Fixed wait between bulk retry attempts.
    pub bulk_retry_interval: Duration,
    /// Fixed polling interval while waiting for cluster health.
    pub health_poll_interval: Duration,
    /// Overall deadline for the health wait; fatal on expiry.
    pub health_timeout: Duration,
}

impl Default for OpenSearchConfig {
    fn default() -> Self {
        Self {
            bulk_timeout: Duration::from_secs(300),
            bulk_retry_attempts: 3,
            bulk_retry_interval: Duration::from_secs(5),
            health_poll_interval: Duration::from_secs(1),
            health_timeout: Duration::from_secs(120),
        }
    }
}

/// Retry a transport-level call with bounded attempts and a fixed interval.
/// Exhaustion surfaces the last error.
async fn retry_transient<T, Fut>(
    attempts: u32,
    interval: Duration,
    call: impl Fn() -> Fut,
) -> Result<T, SearchIndexError>
where
    Fut: std::future::Future<Output = Result<T, SearchIndexError>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < attempts => {
                warn!(error = %err, attempt, "Transient transport failure, will retry");
                sleep(interval).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// OpenSearch provider implementation.
///
/// # Example
///
/// ```ignore
/// use dataset_indexer_repository::opensearch::{OpenSearchConfig, OpenSearchProvider};
///
/// let provider = OpenSearchProvider::new("http://localhost:9200", OpenSearchConfig::default())?;
/// provider.wait_until_healthy().await?;
/// ```
pub struct OpenSearchProvider {
    client: OpenSearch,
    config: OpenSearchConfig,
}

impl OpenSearchProvider {
    /// Create a new OpenSearch provider connected to the specified URL.
    pub fn new(url: &str, config: OpenSearchConfig) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(url = %url, "Created OpenSearch provider");

        Ok(Self { client, config })
    }

    /// One health probe. Returns the cluster status string on success.
    async fn probe_health(&self) -> Result<String, SearchIndexError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        Ok(body["status"].as_str().unwrap_or("unknown").to_string())
    }

    /// Extract item-level failures from a bulk response body.
    fn collect_item_failures(body: &Value) -> Vec<BulkItemFailure> {
        let mut failures = Vec::new();
        if let Some(items) = body["items"].as_array() {
            for item in items {
                let update = &item["update"];
                if let Some(err) = update.get("error") {
                    failures.push(BulkItemFailure {
                        id: update["_id"].as_str().unwrap_or_default().to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }
        failures
    }
}

#[async_trait]
impl SearchIndexProvider for OpenSearchProvider {
    /// Poll the cluster at a fixed interval until it reports yellow or green.
    ///
    /// Connection refusals are expected while the engine is still coming up
    /// and are retried silently; exhaustion of the overall timeout is fatal.
    async fn wait_until_healthy(&self) -> Result<(), SearchIndexError> {
        let started = Instant::now();

        loop {
            match self.probe_health().await {
                Ok(status) if status == "yellow" || status == "green" => {
                    info!(
                        status = %status,
                        elapsed_secs = started.elapsed().as_secs(),
                        "Search engine is healthy"
                    );
                    return Ok(());
                }
                Ok(status) => {
                    debug!(status = %status, "Cluster not healthy yet, will try again");
                }
                Err(e) => {
                    debug!(error = %e, "Search engine not up yet, will try again");
                }
            }

            if started.elapsed() >= self.config.health_timeout {
                return Err(SearchIndexError::cluster_health(format!(
                    "Cluster failed to become healthy within {}s",
                    self.config.health_timeout.as_secs()
                )));
            }
            sleep(self.config.health_poll_interval).await;
        }
    }

    async fn ensure_index_exists(
        &self,
        index: &str,
        body: &Value,
    ) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        if response.status_code().is_success() {
            debug!(index = %index, "Index already exists");
            return Ok(());
        }

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(body.clone())
            .send()
            .await
            .map_err(|e| SearchIndexError::index_creation(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(SearchIndexError::index_creation(format!(
                "Create of {} failed with status {}: {}",
                index, status, error_body
            )));
        }

        info!(index = %index, "Created index");
        Ok(())
    }

    async fn recreate_index(&self, index: &str, body: &Value) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchIndexError::index_creation(e.to_string()))?;

        let status = response.status_code();
        // 404 is acceptable - the index may not exist on a first run
        if !status.is_success() && status.as_u16() != 404 {
            let error_body = response.text().await.unwrap_or_default();
            return Err(SearchIndexError::index_creation(format!(
                "Delete of {} failed with status {}: {}",
                index, status, error_body
            )));
        }

        info!(index = %index, "Deleting and recreating index");
        self.ensure_index_exists(index, body).await
    }

    async fn put_mapping(&self, index: &str, mapping: &Value) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .put_mapping(IndicesPutMappingParts::Index(&[index]))
            .body(mapping.clone())
            .send()
            .await
            .map_err(|e| SearchIndexError::mapping(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(index = %index, status = %status, body = %error_body, "Put mapping failed");
            return Err(SearchIndexError::mapping(format!(
                "Put mapping on {} failed with status {}: {}",
                index, status, error_body
            )));
        }

        debug!(index = %index, "Applied mapping");
        Ok(())
    }

    async fn put_settings(&self, index: &str, settings: &Value) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .put_settings(IndicesPutSettingsParts::Index(&[index]))
            .body(settings.clone())
            .send()
            .await
            .map_err(|e| SearchIndexError::settings(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(index = %index, status = %status, body = %error_body, "Put settings failed");
            return Err(SearchIndexError::settings(format!(
                "Put settings on {} failed with status {}: {}",
                index, status, error_body
            )));
        }

        debug!(index = %index, settings = %settings, "Applied settings");
        Ok(())
    }

    /// Execute one bulk call of update-with-upsert operations.
    ///
    /// Each operation becomes an action line plus a body line: a partial
    /// document with `doc_as_upsert` for direct updates, or a Painless script
    /// with an `upsert` seed for array-merge and time-series operations.
    async fn bulk(
        &self,
        index: &str,
        operations: &[IndexOperation],
    ) -> Result<BulkSummary, SearchIndexError> {
        if operations.is_empty() {
            return Ok(BulkSummary::default());
        }

        let mut pairs = Vec::with_capacity(operations.len());
        for operation in operations {
            pairs.push((
                json!({ "update": { "_id": operation.id() } }),
                scripts::update_body(operation)?,
            ));
        }

        // Transport drops on a long load are expected; the call is retried
        // with a fixed interval before the run is declared dead.
        let response = retry_transient(
            self.config.bulk_retry_attempts,
            self.config.bulk_retry_interval,
            || {
                let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(pairs.len() * 2);
                for (header, update) in &pairs {
                    body.push(header.clone().into());
                    body.push(update.clone().into());
                }
                let request = self
                    .client
                    .bulk(BulkParts::Index(index))
                    .request_timeout(self.config.bulk_timeout)
                    .body(body);
                async move {
                    request
                        .send()
                        .await
                        .map_err(|e| SearchIndexError::bulk(e.to_string()))
                }
            },
        )
        .await?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(index = %index, status = %status, body = %error_body, "Bulk request failed");
            return Err(SearchIndexError::bulk(format!(
                "Bulk against {} failed with status {}: {}",
                index, status, error_body
            )));
        }

        let response_body: Value = response
            .json()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        let failures = if response_body["errors"].as_bool().unwrap_or(false) {
            Self::collect_item_failures(&response_body)
        } else {
            Vec::new()
        };

        if !failures.is_empty() {
            warn!(
                index = %index,
                failed = failures.len(),
                total = operations.len(),
                "Bulk completed with item-level failures"
            );
        }

        Ok(BulkSummary {
            total: operations.len(),
            succeeded: operations.len() - failures.len(),
            failures,
        })
    }

    /// Scroll over every document in the index.
    async fn scan_all(&self, index: &str) -> Result<Vec<(String, Value)>, SearchIndexError> {
        let response = self
            .client
            .search(SearchParts::Index(&[index]))
            .scroll(SCROLL_KEEPALIVE)
            .body(json!({
                "query": { "match_all": {} },
                "size": SCROLL_PAGE_SIZE
            }))
            .send()
            .await
            .map_err(|e| SearchIndexError::scan(e.to_string()))?;

        let mut page: Value = response
            .json()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        let mut documents = Vec::new();
        let mut scroll_id = None;

        loop {
            let hits = page["hits"]["hits"].as_array().cloned().unwrap_or_default();
            if hits.is_empty() {
                break;
            }
            for hit in hits {
                let id = hit["_id"].as_str().unwrap_or_default().to_string();
                documents.push((id, hit["_source"].clone()));
            }

            let id = page["_scroll_id"]
                .as_str()
                .ok_or_else(|| SearchIndexError::scan("Missing scroll id in response"))?
                .to_string();

            let response = self
                .client
                .scroll(ScrollParts::ScrollId(&id))
                .scroll(SCROLL_KEEPALIVE)
                .send()
                .await
                .map_err(|e| SearchIndexError::scan(e.to_string()))?;

            scroll_id = Some(id);
            page = response
                .json()
                .await
                .map_err(|e| SearchIndexError::parse(e.to_string()))?;
        }

        if let Some(id) = scroll_id {
            // Free the scroll context; failing to do so is harmless but noisy.
            let _ = self
                .client
                .clear_scroll(ClearScrollParts::ScrollId(&[&id]))
                .send()
                .await;
        }

        debug!(index = %index, count = documents.len(), "Scanned all documents");
        Ok(documents)
    }
}
