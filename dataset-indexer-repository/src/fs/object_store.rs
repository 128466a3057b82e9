//! Filesystem object store.
//!
//! Buckets are directories under a root; objects are files, with `/` in
//! object names mapping to subdirectories.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::errors::ObjectStoreError;
use crate::interfaces::ObjectStoreProvider;

/// Object storage rooted at a local directory.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, bucket: &str, object: &str) -> PathBuf {
        self.root.join(bucket).join(object)
    }

    /// Collect relative file paths under `dir`, depth-first.
    async fn walk(base: &Path) -> Result<Vec<String>, ObjectStoreError> {
        let mut found = Vec::new();
        let mut pending = vec![base.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if let Ok(relative) = path.strip_prefix(base) {
                    found.push(relative.to_string_lossy().replace('\\', "/"));
                }
            }
        }

        found.sort();
        Ok(found)
    }
}

#[async_trait]
impl ObjectStoreProvider for FsObjectStore {
    async fn ensure_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError> {
        fs::create_dir_all(self.root.join(bucket))
            .await
            .map_err(|e| ObjectStoreError::bucket(format!("{}: {}", bucket, e)))
    }

    async fn list_by_prefix(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<String>, ObjectStoreError> {
        let base = self.root.join(bucket);
        let objects = Self::walk(&base).await?;
        Ok(objects
            .into_iter()
            .filter(|name| name.starts_with(prefix))
            .collect())
    }

    async fn read_text(&self, bucket: &str, object: &str) -> Result<String, ObjectStoreError> {
        match fs::read_to_string(self.object_path(bucket, object)).await {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(ObjectStoreError::not_found(bucket, object))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write_text(
        &self,
        bucket: &str,
        object: &str,
        contents: &str,
    ) -> Result<(), ObjectStoreError> {
        let path = self.object_path(bucket, object);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, contents).await?;
        debug!(bucket = %bucket, object = %object, bytes = contents.len(), "Wrote object");
        Ok(())
    }

    async fn delete(&self, bucket: &str, object: &str) -> Result<(), ObjectStoreError> {
        match fs::remove_file(self.object_path(bucket, object)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
