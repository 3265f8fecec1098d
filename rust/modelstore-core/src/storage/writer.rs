// rust/modelstore-core/src/storage/writer.rs

//! Uploading local files and creating folder markers.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;

use super::backend::ObjectBackend;
use crate::error::{Result, ResultExt, StoreError};
use crate::table::{write_csv, Table, TableFormat};

/// Options for [`ObjectWriter::upload`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadOptions {
    /// Delete the local file once the upload has succeeded.
    pub delete_local_after: bool,
}

impl UploadOptions {
    pub fn remove_local() -> Self {
        Self {
            delete_local_after: true,
        }
    }
}

/// What an upload did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub bucket: String,
    pub key: String,
    pub size: u64,
    /// True when the local file was deleted after the upload.
    pub local_removed: bool,
}

/// Writes local files and tables into buckets.
#[derive(Clone)]
pub struct ObjectWriter {
    backend: Arc<dyn ObjectBackend>,
    format: TableFormat,
}

impl ObjectWriter {
    pub fn new(backend: Arc<dyn ObjectBackend>, format: TableFormat) -> Self {
        Self { backend, format }
    }

    /// Uploads the file at `local_path` to `bucket/key`.
    ///
    /// The local file is only removed after the upload succeeded. A failed
    /// removal is logged and reported in the receipt, not returned as an
    /// error, because the object is already stored.
    ///
    /// # Errors
    ///
    /// Returns `LocalIo` if the file cannot be read, or a backend error if
    /// the upload fails. The local file is kept in both cases.
    pub async fn upload(
        &self,
        local_path: impl AsRef<Path>,
        bucket: &str,
        key: &str,
        options: UploadOptions,
    ) -> Result<UploadReceipt> {
        let local_path = local_path.as_ref();
        let data = tokio::fs::read(local_path)
            .await
            .map_err(|e| StoreError::local_io_with_source(local_path, "failed to read file", e))
            .context("upload")?;

        let size = data.len() as u64;
        self.backend
            .put(bucket, key, Bytes::from(data))
            .await
            .context("upload")?;
        tracing::info!("Uploaded {} ({} bytes) to {}/{}", local_path.display(), size, bucket, key);

        let local_removed = options.delete_local_after && remove_local(local_path).await;

        Ok(UploadReceipt {
            bucket: bucket.to_string(),
            key: key.to_string(),
            size,
            local_removed,
        })
    }

    /// Makes sure a zero-byte marker exists for `folder`.
    ///
    /// The marker key always ends with exactly one `/`. Returns true when the
    /// marker was created and false when it was already there, in which case
    /// nothing is written.
    ///
    /// # Errors
    ///
    /// Returns an error if the folder name is empty, or on backend failures
    /// other than the marker not existing.
    pub async fn ensure_folder_marker(&self, bucket: &str, folder: &str) -> Result<bool> {
        let name = folder.trim_end_matches('/');
        if name.is_empty() {
            return Err(StoreError::backend(
                "ensure_folder_marker",
                bucket,
                folder,
                "folder name is empty",
            ));
        }
        let marker = format!("{name}/");

        match self.backend.head(bucket, &marker).await {
            Ok(_) => {
                tracing::debug!("Folder marker {}/{} already exists", bucket, marker);
                Ok(false)
            }
            Err(e) if e.is_not_found() => {
                self.backend
                    .put(bucket, &marker, Bytes::new())
                    .await
                    .context("ensure_folder_marker")?;
                tracing::info!("Created folder marker {}/{}", bucket, marker);
                Ok(true)
            }
            Err(e) => Err(e.context("ensure_folder_marker")),
        }
    }

    /// Writes `table` to `local_path` as delimited text, then uploads it.
    ///
    /// The local file stays in place unless `options` asks for removal.
    pub async fn upload_table(
        &self,
        table: &Table,
        local_path: impl AsRef<Path>,
        bucket: &str,
        key: &str,
        options: UploadOptions,
    ) -> Result<UploadReceipt> {
        let local_path = local_path.as_ref();
        let mut buf = Vec::new();
        write_csv(table, &mut buf, &self.format).context("upload_table")?;

        tokio::fs::write(local_path, &buf)
            .await
            .map_err(|e| StoreError::local_io_with_source(local_path, "failed to write table", e))
            .context("upload_table")?;
        tracing::debug!(
            "Wrote {} rows to {}",
            table.num_rows(),
            local_path.display()
        );

        self.upload(local_path, bucket, key, options).await
    }
}

/// Deletes an uploaded file. Returns whether it is gone.
async fn remove_local(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            tracing::debug!("Removed local file {}", path.display());
            true
        }
        Err(e) => {
            tracing::warn!("Uploaded {} but could not remove it: {}", path.display(), e);
            false
        }
    }
}
