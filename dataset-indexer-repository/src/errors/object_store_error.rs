//! Object storage collaborator error types.

use thiserror::Error;

/// Errors from object storage operations.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    /// The requested object does not exist.
    #[error("Object not found: {bucket}/{object}")]
    ObjectNotFound { bucket: String, object: String },

    /// Failed to create or access a bucket.
    #[error("Bucket error: {0}")]
    BucketError(String),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ObjectStoreError {
    /// Create an object-not-found error.
    pub fn not_found(bucket: impl Into<String>, object: impl Into<String>) -> Self {
        Self::ObjectNotFound {
            bucket: bucket.into(),
            object: object.into(),
        }
    }

    /// Create a bucket error.
    pub fn bucket(msg: impl Into<String>) -> Self {
        Self::BucketError(msg.into())
    }
}
