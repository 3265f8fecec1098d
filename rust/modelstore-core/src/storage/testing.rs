// rust/modelstore-core/src/storage/testing.rs

//! Test backend that counts calls.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use super::{ObjectBackend, ObjectMeta, ObjectStoreBackend, ObjectSummary};
use crate::error::{Result, StoreError};

/// In-memory backend that counts reads and writes, can fail writes and can
/// slow down reads.
pub(crate) struct CountingBackend {
    inner: ObjectStoreBackend,
    gets: AtomicUsize,
    puts: AtomicUsize,
    fail_puts: AtomicBool,
    get_delay: Option<Duration>,
}

impl CountingBackend {
    pub(crate) fn new() -> Self {
        Self {
            inner: ObjectStoreBackend::memory(),
            gets: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
            fail_puts: AtomicBool::new(false),
            get_delay: None,
        }
    }

    /// Every `get` sleeps for `delay` before reading.
    pub(crate) fn with_get_delay(mut self, delay: Duration) -> Self {
        self.get_delay = Some(delay);
        self
    }

    pub(crate) fn failing_puts() -> Self {
        let backend = Self::new();
        backend.fail_puts.store(true, Ordering::SeqCst);
        backend
    }

    pub(crate) fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub(crate) fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectBackend for CountingBackend {
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectSummary>> {
        self.inner.list(bucket, prefix).await
    }

    async fn head(&self, bucket: &str, key: &str) -> Result<ObjectMeta> {
        self.inner.head(bucket, key).await
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        // Give concurrent callers a chance to interleave
        match self.get_delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }
        self.inner.get(bucket, key).await
    }

    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StoreError::backend("put", bucket, key, "injected failure"));
        }
        self.inner.put(bucket, key, data).await
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        self.inner.delete(bucket, key).await
    }

    fn backend_type(&self) -> &'static str {
        "counting"
    }
}
