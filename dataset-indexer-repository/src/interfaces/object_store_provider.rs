//! Object storage provider trait definition.
//!
//! Object storage is an external collaborator: the indexer consumes
//! list-by-prefix, read-as-text, write, delete and create-bucket-if-absent,
//! and nothing else.

use async_trait::async_trait;

use crate::errors::ObjectStoreError;

/// Abstracts the object storage backing manifests, export shards and the
/// sample snapshot artifact.
#[async_trait]
pub trait ObjectStoreProvider: Send + Sync {
    /// Create the bucket if it does not exist yet.
    async fn ensure_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError>;

    /// List object names under a prefix.
    async fn list_by_prefix(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<String>, ObjectStoreError>;

    /// Read one object as UTF-8 text.
    async fn read_text(&self, bucket: &str, object: &str) -> Result<String, ObjectStoreError>;

    /// Write one object from UTF-8 text, overwriting if present.
    async fn write_text(
        &self,
        bucket: &str,
        object: &str,
        contents: &str,
    ) -> Result<(), ObjectStoreError>;

    /// Delete one object. Deleting a missing object is not an error.
    async fn delete(&self, bucket: &str, object: &str) -> Result<(), ObjectStoreError>;
}
