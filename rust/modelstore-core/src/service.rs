// rust/modelstore-core/src/service.rs

//! One-stop access to buckets, tables and stored models.

use std::path::Path;
use std::sync::Arc;

use crate::artifact::decode_artifact;
use crate::config::ModelStoreConfig;
use crate::error::{Result, ResultExt};
use crate::model::{Model, ModelRegistry};
use crate::storage::{
    ObjectBackend, ObjectHandle, ObjectReader, ObjectResolver, ObjectStoreBackend, ObjectWriter,
    UploadOptions, UploadReceipt,
};
use crate::table::{Table, TableFormat};

/// Resolver, reader and writer over one shared backend.
#[derive(Clone)]
pub struct StorageService {
    backend: Arc<dyn ObjectBackend>,
    resolver: ObjectResolver,
    reader: ObjectReader,
    writer: ObjectWriter,
    registry: ModelRegistry,
}

impl StorageService {
    pub fn new(backend: Arc<dyn ObjectBackend>, format: TableFormat) -> Self {
        Self {
            resolver: ObjectResolver::new(backend.clone()),
            reader: ObjectReader::new(format.clone()),
            writer: ObjectWriter::new(backend.clone(), format),
            registry: ModelRegistry::default(),
            backend,
        }
    }

    /// Builds the backend described by `config` and wraps it.
    pub fn from_config(config: &ModelStoreConfig) -> Result<Self> {
        let backend = ObjectStoreBackend::from_config(&config.storage)?;
        tracing::info!("Using {} storage backend", backend.backend_type());
        Ok(Self::new(Arc::new(backend), TableFormat::from(&config.table)))
    }

    /// Replaces the registry used to decode models.
    pub fn with_registry(mut self, registry: ModelRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn backend(&self) -> &Arc<dyn ObjectBackend> {
        &self.backend
    }

    pub fn resolver(&self) -> &ObjectResolver {
        &self.resolver
    }

    pub fn reader(&self) -> &ObjectReader {
        &self.reader
    }

    pub fn writer(&self) -> &ObjectWriter {
        &self.writer
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// True if any object key in `bucket` starts with `key`.
    pub async fn key_available(&self, bucket: &str, key: &str) -> Result<bool> {
        self.resolver.exists(bucket, key).await
    }

    pub async fn resolve(&self, bucket: &str, prefix: &str) -> Result<ObjectHandle> {
        self.resolver.resolve(bucket, prefix).await
    }

    /// Resolves `key` and parses it as a delimited-text table.
    pub async fn read_csv(&self, bucket: &str, key: &str) -> Result<Table> {
        let handle = self.resolver.resolve(bucket, key).await.context("read_csv")?;
        let table = self.reader.read_table(&handle).await.context("read_csv")?;
        tracing::info!(
            "Read table {}/{} ({} rows, {} columns)",
            bucket,
            handle.key(),
            table.num_rows(),
            table.num_columns()
        );
        Ok(table)
    }

    pub async fn upload_file(
        &self,
        local_path: impl AsRef<Path>,
        bucket: &str,
        key: &str,
        options: UploadOptions,
    ) -> Result<UploadReceipt> {
        self.writer.upload(local_path, bucket, key, options).await
    }

    /// Writes `table` to `local_path` and uploads it to `bucket/key`.
    pub async fn upload_csv(
        &self,
        table: &Table,
        local_path: impl AsRef<Path>,
        bucket: &str,
        key: &str,
        options: UploadOptions,
    ) -> Result<UploadReceipt> {
        self.writer
            .upload_table(table, local_path, bucket, key, options)
            .await
    }

    /// Creates a folder marker unless one exists. Returns true if created.
    pub async fn create_folder(&self, bucket: &str, folder: &str) -> Result<bool> {
        self.writer.ensure_folder_marker(bucket, folder).await
    }

    /// Fetches and decodes the model stored under `dir/name`.
    ///
    /// The key is resolved as a prefix, so the first object in listing order
    /// whose key starts with it is loaded.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if nothing matches, or a deserialization error if
    /// the object is not a valid model artifact.
    pub async fn load_model(&self, bucket: &str, name: &str, dir: Option<&str>) -> Result<Arc<dyn Model>> {
        let key = model_key(name, dir);
        let handle = self.resolver.resolve(bucket, &key).await.context("load_model")?;
        let data = self.reader.read_bytes(&handle).await.context("load_model")?;

        let model = decode_artifact(handle.key(), &data, &self.registry).context("load_model")?;
        tracing::info!(
            "Loaded {} model from {}/{} ({} bytes)",
            model.kind(),
            bucket,
            handle.key(),
            data.len()
        );
        Ok(model)
    }
}

/// Joins an optional folder and a name into an object key.
pub fn model_key(name: &str, dir: Option<&str>) -> String {
    match dir {
        Some(dir) if !dir.is_empty() => format!("{}/{}", dir.trim_end_matches('/'), name),
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{encode_artifact, ArtifactOptions};
    use crate::model::{LinearModel, ModelSchema};
    use crate::storage::testing::CountingBackend;
    use bytes::Bytes;
    use tempfile::TempDir;

    fn service() -> (StorageService, Arc<CountingBackend>) {
        let backend = Arc::new(CountingBackend::new());
        (StorageService::new(backend.clone(), TableFormat::default()), backend)
    }

    #[test]
    fn test_model_key() {
        assert_eq!(model_key("model.bin", None), "model.bin");
        assert_eq!(model_key("model.bin", Some("")), "model.bin");
        assert_eq!(model_key("model.bin", Some("prod")), "prod/model.bin");
        assert_eq!(model_key("model.bin", Some("prod/")), "prod/model.bin");
    }

    #[tokio::test]
    async fn test_key_available() {
        let (service, backend) = service();
        backend.put("data", "train/part-0.csv", Bytes::from_static(b"a\n1\n")).await.unwrap();

        assert!(service.key_available("data", "train/").await.unwrap());
        assert!(!service.key_available("data", "test/").await.unwrap());
    }

    #[tokio::test]
    async fn test_upload_and_read_csv() {
        let (service, _backend) = service();
        let dir = TempDir::new().unwrap();
        let table = Table::from_rows(
            ["id", "age"],
            vec![
                vec![Some("1".into()), Some("30".into())],
                vec![Some("2".into()), None],
            ],
        )
        .unwrap();

        service
            .upload_csv(&table, dir.path().join("t.csv"), "data", "tables/t.csv", UploadOptions::remove_local())
            .await
            .unwrap();
        assert!(!dir.path().join("t.csv").exists());

        let back = service.read_csv("data", "tables/t.csv").await.unwrap();
        assert_eq!(back, table);
    }

    #[tokio::test]
    async fn test_read_csv_missing() {
        let (service, _backend) = service();
        let err = service.read_csv("data", "nope.csv").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().starts_with("read_csv: "));
    }

    #[tokio::test]
    async fn test_create_folder() {
        let (service, backend) = service();
        assert!(service.create_folder("data", "reports").await.unwrap());
        assert!(!service.create_folder("data", "reports").await.unwrap());
        assert_eq!(backend.puts(), 1);
    }

    #[tokio::test]
    async fn test_load_model() {
        let (service, backend) = service();
        let model = LinearModel::new(ModelSchema::new(["x"], "y"), vec![3.0], 1.0).unwrap();
        let bytes = encode_artifact(&model, &ArtifactOptions::default()).unwrap();
        backend.put("models", "prod/model.bin", Bytes::from(bytes)).await.unwrap();

        let loaded = service.load_model("models", "model.bin", Some("prod")).await.unwrap();
        assert_eq!(loaded.kind(), "linear");
        assert_eq!(loaded.schema().inputs, vec!["x".to_string()]);
    }

    #[tokio::test]
    async fn test_load_model_rejects_garbage() {
        let (service, backend) = service();
        backend
            .put("models", "prod/model.pkl", Bytes::from_static(b"\x80\x04\x95 pickled"))
            .await
            .unwrap();

        let err = service.load_model("models", "prod/model.pkl", None).await.unwrap_err();
        assert!(matches!(err.root(), crate::StoreError::Deserialization { .. }));
    }
}
