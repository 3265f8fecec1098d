// rust/modelstore-core/src/storage/backend.rs

//! The storage backend boundary.
//!
//! Components never talk to a storage SDK directly. They share one
//! `Arc<dyn ObjectBackend>` that speaks in bucket names and plain string
//! keys, the way S3 does.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// Metadata about a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Size of the object in bytes.
    pub size: u64,
    /// Last modification time, if the backend reports one.
    pub last_modified: Option<DateTime<Utc>>,
    /// ETag or content hash, if available.
    pub e_tag: Option<String>,
}

/// A listing entry: where an object lives and what it looks like.
///
/// A summary cannot be read. Reading requires an
/// [`ObjectHandle`](super::ObjectHandle) obtained from the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub bucket: String,
    pub key: String,
    pub meta: ObjectMeta,
}

impl ObjectSummary {
    /// True for zero-byte keys ending in `/`.
    pub fn is_folder_marker(&self) -> bool {
        self.key.ends_with('/') && self.meta.size == 0
    }
}

/// The operations any object storage backend must support.
///
/// # Object Safety
///
/// This trait is object-safe and is shared as `Arc<dyn ObjectBackend>`.
#[async_trait]
pub trait ObjectBackend: Send + Sync {
    /// Lists every object whose key starts with `prefix`.
    ///
    /// The prefix is a plain string prefix, not a path segment, and the
    /// result keeps the order the backend produced. Paginated listings are
    /// consumed to the end.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails part way.
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectSummary>>;

    /// Retrieves metadata for the object stored at exactly `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`](crate::StoreError::NotFound) when
    /// no such object exists, or a backend error otherwise.
    async fn head(&self, bucket: &str, key: &str) -> Result<ObjectMeta>;

    /// Fetches the full content of an object.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no such object exists, or a backend error.
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes>;

    /// Stores `data` at `key`, replacing any existing object.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload fails.
    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> Result<()>;

    /// Deletes an object.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    async fn delete(&self, bucket: &str, key: &str) -> Result<()>;

    /// Returns the backend type name (e.g., "local", "s3").
    fn backend_type(&self) -> &'static str;
}
