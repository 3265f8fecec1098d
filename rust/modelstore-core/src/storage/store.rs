// rust/modelstore-core/src/storage/store.rs

//! Bucket storage on top of the object_store crate.
//!
//! One `ObjectStore` client is opened per bucket on first use and kept for
//! the lifetime of the backend, so every component sharing the backend
//! shares the connections as well. S3 (feature `s3`), a directory per bucket
//! on the local filesystem, and in-memory buckets are supported.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
#[cfg(feature = "s3")]
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use tokio::sync::RwLock;

#[cfg(feature = "s3")]
use object_store::aws::AmazonS3Builder;
#[cfg(feature = "s3")]
use object_store::{BackoffConfig, ClientOptions, RetryConfig};

use super::backend::{ObjectBackend, ObjectMeta, ObjectSummary};
#[cfg(feature = "s3")]
use crate::config::S3Config;
use crate::config::{StorageBackendType, StorageConfig};
use crate::error::{Result, StoreError};

/// Object name used to persist folder markers.
///
/// object_store paths cannot end with a delimiter, so a marker key such as
/// `data/` is stored as `data/.keep` and reported back as `data/`.
pub const FOLDER_MARKER_OBJECT: &str = ".keep";

enum BucketFlavor {
    #[cfg(feature = "s3")]
    S3(S3Config),
    Local(PathBuf),
    Memory,
}

/// Storage backend that maps bucket names to object_store clients.
pub struct ObjectStoreBackend {
    flavor: BucketFlavor,
    /// Clients opened so far, keyed by bucket name.
    stores: RwLock<HashMap<String, Arc<dyn ObjectStore>>>,
    /// Multipart threshold and chunk size; `None` means single PUTs only.
    multipart: Option<(u64, usize)>,
}

impl ObjectStoreBackend {
    /// Creates a backend from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the S3 backend is selected without S3 settings,
    /// or when the crate was built without the `s3` feature.
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        match config.backend {
            StorageBackendType::Local => Ok(Self::local(&config.base_path)),
            StorageBackendType::Memory => Ok(Self::memory()),
            StorageBackendType::S3 => Self::s3_from_config(config),
        }
    }

    #[cfg(feature = "s3")]
    fn s3_from_config(config: &StorageConfig) -> Result<Self> {
        let s3 = config.s3.clone().ok_or_else(|| {
            StoreError::config("storage.s3 configuration is required when backend is 's3'")
        })?;
        s3.validate()?;
        Ok(Self::s3(s3))
    }

    #[cfg(not(feature = "s3"))]
    fn s3_from_config(_config: &StorageConfig) -> Result<Self> {
        Err(StoreError::config(
            "S3 storage requires building with the 's3' feature",
        ))
    }

    /// Buckets are directories directly under `base_path`.
    pub fn local(base_path: impl Into<PathBuf>) -> Self {
        Self::with_flavor(BucketFlavor::Local(base_path.into()), None)
    }

    /// Buckets live in process memory.
    pub fn memory() -> Self {
        Self::with_flavor(BucketFlavor::Memory, None)
    }

    /// Buckets are S3 buckets reached with the given client settings.
    #[cfg(feature = "s3")]
    pub fn s3(config: S3Config) -> Self {
        let multipart = Some((config.multipart_threshold, config.multipart_chunk_size));
        Self::with_flavor(BucketFlavor::S3(config), multipart)
    }

    fn with_flavor(flavor: BucketFlavor, multipart: Option<(u64, usize)>) -> Self {
        Self {
            flavor,
            stores: RwLock::new(HashMap::new()),
            multipart,
        }
    }

    /// Serves `bucket` from an already built client instead of opening one.
    #[must_use]
    pub fn with_bucket(mut self, bucket: impl Into<String>, store: Arc<dyn ObjectStore>) -> Self {
        self.stores.get_mut().insert(bucket.into(), store);
        self
    }

    /// Uploads payloads of at least `threshold` bytes in `chunk_size` parts.
    #[must_use]
    pub fn with_multipart(mut self, threshold: u64, chunk_size: usize) -> Self {
        self.multipart = Some((threshold, chunk_size.max(1)));
        self
    }

    /// Returns the client for a bucket, opening it on first use.
    async fn store_for(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
        if let Some(store) = self.stores.read().await.get(bucket) {
            return Ok(store.clone());
        }

        let mut stores = self.stores.write().await;
        // Another caller may have opened it while we waited for the lock
        if let Some(store) = stores.get(bucket) {
            return Ok(store.clone());
        }

        let store = self.open_bucket(bucket)?;
        tracing::debug!("Opened {} bucket '{}'", self.backend_type(), bucket);
        stores.insert(bucket.to_string(), store.clone());
        Ok(store)
    }

    fn open_bucket(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
        if bucket.is_empty() {
            return Err(StoreError::config("bucket name must not be empty"));
        }

        match &self.flavor {
            #[cfg(feature = "s3")]
            BucketFlavor::S3(config) => open_s3_bucket(config, bucket),
            BucketFlavor::Local(base_path) => {
                let dir = base_path.join(bucket);
                std::fs::create_dir_all(&dir).map_err(|e| {
                    StoreError::local_io_with_source(&dir, "failed to create bucket directory", e)
                })?;
                let absolute = dir.canonicalize().map_err(|e| {
                    StoreError::local_io_with_source(&dir, "failed to resolve bucket directory", e)
                })?;
                let store = LocalFileSystem::new_with_prefix(absolute).map_err(|e| {
                    StoreError::config_with_source("failed to open local bucket", e)
                })?;
                Ok(Arc::new(store))
            }
            BucketFlavor::Memory => Ok(Arc::new(InMemory::new())),
        }
    }

    async fn put_multipart(
        store: &dyn ObjectStore,
        bucket: &str,
        key: &str,
        path: &Path,
        data: Bytes,
        chunk_size: usize,
    ) -> Result<()> {
        let mut upload = store
            .put_multipart(path)
            .await
            .map_err(|e| StoreError::backend_with_source("initiate multipart upload", bucket, key, e))?;

        let mut offset = 0;
        while offset < data.len() {
            let end = (offset + chunk_size).min(data.len());
            let part = PutPayload::from_bytes(data.slice(offset..end));
            if let Err(e) = upload.put_part(part).await {
                if let Err(abort_err) = upload.abort().await {
                    tracing::warn!("Failed to abort multipart upload of {}/{}: {}", bucket, key, abort_err);
                }
                return Err(StoreError::backend_with_source("upload part", bucket, key, e));
            }
            offset = end;
        }

        upload
            .complete()
            .await
            .map_err(|e| StoreError::backend_with_source("complete multipart upload", bucket, key, e))?;
        Ok(())
    }
}

#[cfg(feature = "s3")]
fn open_s3_bucket(config: &S3Config, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
    let mut builder = AmazonS3Builder::from_env()
        .with_bucket_name(bucket)
        .with_region(&config.region);

    // Set endpoint if provided (for MinIO, LocalStack, etc.)
    if let Some(endpoint) = &config.endpoint {
        builder = builder.with_endpoint(endpoint);
    }

    // Set credentials if provided
    if let Some(access_key) = &config.access_key_id {
        builder = builder.with_access_key_id(access_key);
    }
    if let Some(secret_key) = &config.secret_access_key {
        builder = builder.with_secret_access_key(secret_key);
    }
    if let Some(token) = &config.session_token {
        builder = builder.with_token(token);
    }

    // Configure path style (required for MinIO)
    if config.force_path_style {
        builder = builder.with_virtual_hosted_style_request(false);
    }

    if config.allow_http {
        builder = builder.with_allow_http(true);
    }

    let client_options = ClientOptions::new()
        .with_timeout(Duration::from_millis(config.request_timeout_ms))
        .with_connect_timeout(Duration::from_millis(config.connect_timeout_ms));

    // Retries belong to the client; nothing above this layer retries.
    let retry = RetryConfig {
        backoff: BackoffConfig {
            init_backoff: Duration::from_millis(config.retry_delay_ms),
            max_backoff: Duration::from_millis(config.max_retry_delay_ms),
            base: 2.0,
        },
        max_retries: config.max_retries as usize,
        ..Default::default()
    };

    let store = builder
        .with_client_options(client_options)
        .with_retry(retry)
        .build()
        .map_err(|e| StoreError::config_with_source("failed to build S3 client", e))?;

    Ok(Arc::new(store))
}

/// Converts a logical key to an object_store path.
fn object_path(bucket: &str, key: &str) -> Result<Path> {
    if key.is_empty() {
        return Err(StoreError::backend("resolve key", bucket, key, "object key must not be empty"));
    }

    let (base, is_marker) = match key.strip_suffix('/') {
        Some(folder) => (folder, true),
        None => (key, false),
    };

    let path = Path::parse(base).map_err(|e| {
        StoreError::backend("resolve key", bucket, key, format!("invalid object key: {e}"))
    })?;

    Ok(if is_marker {
        path.child(FOLDER_MARKER_OBJECT)
    } else {
        path
    })
}

/// Converts an object_store location back to its logical key.
///
/// Only zero-byte `.keep` objects are folder markers. A `.keep` object with
/// content is an ordinary object and keeps its own key.
fn logical_key(location: &Path, size: u64) -> String {
    let raw = location.as_ref();
    if size != 0 {
        return raw.to_string();
    }
    if raw == FOLDER_MARKER_OBJECT {
        return "/".to_string();
    }
    match raw.strip_suffix(FOLDER_MARKER_OBJECT) {
        Some(folder) if folder.ends_with('/') => folder.to_string(),
        _ => raw.to_string(),
    }
}

/// Directory to list so that every key starting with `prefix` is visited.
fn listing_root(bucket: &str, prefix: &str) -> Result<Option<Path>> {
    let parent = match prefix.rfind('/') {
        Some(idx) => &prefix[..idx],
        None => "",
    };
    if parent.is_empty() {
        return Ok(None);
    }
    Path::parse(parent).map(Some).map_err(|e| {
        StoreError::backend("list", bucket, prefix, format!("invalid prefix: {e}"))
    })
}

fn convert_meta(meta: &object_store::ObjectMeta) -> ObjectMeta {
    ObjectMeta {
        size: meta.size as u64,
        last_modified: Some(meta.last_modified),
        e_tag: meta.e_tag.clone(),
    }
}

/// Maps object_store's not-found error to ours and wraps the rest.
fn convert_error(operation: &'static str, bucket: &str, key: &str, error: object_store::Error) -> StoreError {
    match error {
        object_store::Error::NotFound { .. } => StoreError::not_found(bucket, key),
        other => StoreError::backend_with_source(operation, bucket, key, other),
    }
}

#[async_trait]
impl ObjectBackend for ObjectStoreBackend {
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectSummary>> {
        let store = self.store_for(bucket).await?;
        let root = listing_root(bucket, prefix)?;

        let mut stream = store.list(root.as_ref());
        let mut summaries = Vec::new();
        while let Some(entry) = stream.next().await {
            let meta = entry.map_err(|e| StoreError::backend_with_source("list", bucket, prefix, e))?;
            let raw = meta.location.as_ref();
            let logical = logical_key(&meta.location, meta.size as u64);
            // A marker matched through its stored name is reported under that name
            let key = if logical.starts_with(prefix) {
                logical
            } else if raw.starts_with(prefix) {
                raw.to_string()
            } else {
                continue;
            };
            summaries.push(ObjectSummary {
                bucket: bucket.to_string(),
                key,
                meta: convert_meta(&meta),
            });
        }

        tracing::debug!("Listed {} objects under {}/{}", summaries.len(), bucket, prefix);
        Ok(summaries)
    }

    async fn head(&self, bucket: &str, key: &str) -> Result<ObjectMeta> {
        let store = self.store_for(bucket).await?;
        let path = object_path(bucket, key)?;

        let meta = store
            .head(&path)
            .await
            .map_err(|e| convert_error("head", bucket, key, e))?;
        Ok(convert_meta(&meta))
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let store = self.store_for(bucket).await?;
        let path = object_path(bucket, key)?;

        let result = store
            .get(&path)
            .await
            .map_err(|e| convert_error("get", bucket, key, e))?;
        result
            .bytes()
            .await
            .map_err(|e| convert_error("get", bucket, key, e))
    }

    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> Result<()> {
        let store = self.store_for(bucket).await?;
        let path = object_path(bucket, key)?;

        match self.multipart {
            Some((threshold, chunk_size)) if data.len() as u64 >= threshold && !data.is_empty() => {
                tracing::debug!("Uploading {} bytes to {}/{} in parts", data.len(), bucket, key);
                Self::put_multipart(store.as_ref(), bucket, key, &path, data, chunk_size).await
            }
            _ => {
                store
                    .put(&path, PutPayload::from_bytes(data))
                    .await
                    .map_err(|e| StoreError::backend_with_source("put", bucket, key, e))?;
                Ok(())
            }
        }
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        let store = self.store_for(bucket).await?;
        let path = object_path(bucket, key)?;

        store
            .delete(&path)
            .await
            .map_err(|e| convert_error("delete", bucket, key, e))
    }

    fn backend_type(&self) -> &'static str {
        match self.flavor {
            #[cfg(feature = "s3")]
            BucketFlavor::S3(_) => "s3",
            BucketFlavor::Local(_) => "local",
            BucketFlavor::Memory => "memory",
        }
    }
}
