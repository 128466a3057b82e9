//! Filesystem-backed collaborator implementations.
//!
//! Flat-file datasets live on local disk: table schemas as JSON field lists,
//! rows as newline-delimited JSON, buckets as directories. These back local
//! runs and hermetic tests; hosted warehouse/storage clients plug in behind
//! the same traits.

pub mod object_store;
pub mod warehouse;

pub use object_store::FsObjectStore;
pub use warehouse::FileWarehouse;
