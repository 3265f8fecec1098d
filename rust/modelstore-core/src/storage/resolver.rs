// rust/modelstore-core/src/storage/resolver.rs

//! Object resolution.
//!
//! Listing yields [`ObjectSummary`] values, which describe objects but cannot
//! be read. Reading goes through an [`ObjectHandle`], and the only way to get
//! one is to resolve it here, either by exact key or by prefix.

use std::fmt;
use std::sync::Arc;

use super::backend::{ObjectBackend, ObjectSummary};
use crate::error::{Result, ResultExt, StoreError};

/// A resolved, readable reference to one object.
#[derive(Clone)]
pub struct ObjectHandle {
    bucket: String,
    key: String,
    backend: Arc<dyn ObjectBackend>,
}

impl ObjectHandle {
    fn new(bucket: impl Into<String>, key: impl Into<String>, backend: Arc<dyn ObjectBackend>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            backend,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn backend(&self) -> &dyn ObjectBackend {
        self.backend.as_ref()
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectHandle")
            .field("bucket", &self.bucket)
            .field("key", &self.key)
            .field("backend", &self.backend.backend_type())
            .finish()
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.backend.backend_type(), self.bucket, self.key)
    }
}

/// Lists objects and turns listing results into readable handles.
#[derive(Clone)]
pub struct ObjectResolver {
    backend: Arc<dyn ObjectBackend>,
}

impl ObjectResolver {
    pub fn new(backend: Arc<dyn ObjectBackend>) -> Self {
        Self { backend }
    }

    /// Lists every object whose key starts with `prefix`, in backend order.
    pub async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectSummary>> {
        self.backend.list(bucket, prefix).await.context("list")
    }

    /// Returns true iff at least one object key starts with `prefix`.
    pub async fn exists(&self, bucket: &str, prefix: &str) -> Result<bool> {
        let summaries = self.backend.list(bucket, prefix).await.context("exists")?;
        Ok(!summaries.is_empty())
    }

    /// Resolves the first object whose key starts with `prefix`.
    ///
    /// When several objects match, the first one in backend listing order
    /// wins. Backends do not promise a stable order, so callers that know the
    /// exact key should use [`resolve_exact`](Self::resolve_exact).
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when nothing matches.
    pub async fn resolve(&self, bucket: &str, prefix: &str) -> Result<ObjectHandle> {
        let summaries = self.backend.list(bucket, prefix).await.context("resolve")?;

        let first = summaries
            .first()
            .ok_or_else(|| StoreError::not_found(bucket, prefix).context("resolve"))?;
        if summaries.len() > 1 {
            tracing::debug!(
                "Prefix {}/{} matched {} objects, using '{}'",
                bucket,
                prefix,
                summaries.len(),
                first.key
            );
        }

        let handle = self.handle(first);
        tracing::info!("Found object: {}", handle);
        Ok(handle)
    }

    /// Resolves the object stored at exactly `key`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no object has that key.
    pub async fn resolve_exact(&self, bucket: &str, key: &str) -> Result<ObjectHandle> {
        self.backend.head(bucket, key).await.context("resolve_exact")?;
        Ok(ObjectHandle::new(bucket, key, self.backend.clone()))
    }

    /// Turns a listing entry into a readable handle.
    pub fn handle(&self, summary: &ObjectSummary) -> ObjectHandle {
        ObjectHandle::new(&summary.bucket, &summary.key, self.backend.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ObjectStoreBackend;
    use bytes::Bytes;

    async fn seeded(keys: &[&str]) -> ObjectResolver {
        let backend = ObjectStoreBackend::memory();
        for key in keys {
            backend
                .put("models", key, Bytes::from(format!("content of {key}")))
                .await
                .unwrap();
        }
        ObjectResolver::new(Arc::new(backend))
    }

    #[tokio::test]
    async fn test_exists_matches_listing() {
        let resolver = seeded(&["prod/model.bin", "staging/model.bin"]).await;

        for prefix in ["prod", "prod/model.bin", "staging/", "", "dev", "prod/model.bin.old"] {
            let listed = resolver.list("models", prefix).await.unwrap();
            let exists = resolver.exists("models", prefix).await.unwrap();
            assert_eq!(exists, !listed.is_empty(), "prefix {prefix:?}");
        }
    }

    #[tokio::test]
    async fn test_resolve_empty_listing_is_not_found() {
        let resolver = seeded(&["prod/model.bin"]).await;

        let err = resolver.resolve("models", "dev/model.bin").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("dev/model.bin"));
    }

    #[tokio::test]
    async fn test_resolve_picks_first_in_listing_order() {
        let resolver = seeded(&["prod/model.bin.v2", "prod/model.bin", "prod/model.bin.v1"]).await;

        let listed = resolver.list("models", "prod/model").await.unwrap();
        let handle = resolver.resolve("models", "prod/model").await.unwrap();

        assert_eq!(handle.key(), listed[0].key);
        assert_eq!(handle.bucket(), "models");
    }

    #[tokio::test]
    async fn test_resolve_single_match() {
        let resolver = seeded(&["prod/model.pkl"]).await;

        let handle = resolver.resolve("models", "prod/model.pkl").await.unwrap();
        assert_eq!(handle.key(), "prod/model.pkl");
        assert_eq!(handle.to_string(), "memory://models/prod/model.pkl");
    }

    #[tokio::test]
    async fn test_resolve_exact() {
        let resolver = seeded(&["prod/model.bin", "prod/model.bin.bak"]).await;

        let handle = resolver.resolve_exact("models", "prod/model.bin").await.unwrap();
        assert_eq!(handle.key(), "prod/model.bin");

        // A prefix of an existing key is not an exact match
        let err = resolver.resolve_exact("models", "prod/model").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_handle_from_summary() {
        let resolver = seeded(&["a.csv"]).await;
        let listed = resolver.list("models", "a").await.unwrap();

        let handle = resolver.handle(&listed[0]);
        assert_eq!(handle.key(), "a.csv");
        assert!(format!("{handle:?}").contains("memory"));
    }
}
