// rust/modelstore-core/src/config.rs

//! Configuration management for modelstore.
//!
//! This module provides configuration parsing from TOML files, environment
//! variable overrides, and validation of configuration values.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Result, StoreError};

// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelStoreConfig {
    pub storage: StorageConfig,
    pub model: ModelConfig,
    pub table: TableConfig,
    pub artifact: ArtifactConfig,
}

/// Storage backend type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendType {
    /// One directory per bucket under `base_path`.
    #[default]
    Local,
    /// S3-compatible object storage.
    S3,
    /// Process-local buckets, lost on exit.
    Memory,
}

// Storage configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage backend type: "local", "s3" or "memory".
    pub backend: StorageBackendType,
    // Root directory holding one sub-directory per bucket (local backend only).
    pub base_path: PathBuf,
    /// S3-specific configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3: Option<S3Config>,
}

/// S3-compatible storage configuration.
///
/// Bucket names are supplied per call, so the same client settings are
/// reused for every bucket the process touches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Config {
    /// AWS region (e.g., "us-east-1").
    pub region: String,
    /// Custom endpoint URL (for MinIO, LocalStack, etc.).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// AWS access key ID (if not using instance credentials).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,
    /// AWS secret access key (if not using instance credentials).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,
    /// AWS session token (for temporary credentials).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    /// File size threshold (bytes) above which to use multipart upload.
    pub multipart_threshold: u64,
    /// Chunk size (bytes) for multipart upload parts.
    pub multipart_chunk_size: usize,
    /// Maximum number of retries the client performs for failed requests.
    pub max_retries: u32,
    /// Initial delay (milliseconds) between client retries.
    pub retry_delay_ms: u64,
    /// Maximum delay (milliseconds) between client retries.
    pub max_retry_delay_ms: u64,
    /// Connection timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Whether to use path-style addressing (required for MinIO).
    pub force_path_style: bool,
    /// Whether to allow HTTP (non-TLS) connections.
    pub allow_http: bool,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            multipart_threshold: 100 * 1024 * 1024, // 100 MB
            multipart_chunk_size: 32 * 1024 * 1024, // 32 MB
            max_retries: 5,
            retry_delay_ms: 100,
            max_retry_delay_ms: 30_000,
            connect_timeout_ms: 5_000,
            request_timeout_ms: 30_000,
            force_path_style: false,
            allow_http: false,
        }
    }
}

impl S3Config {
    /// Apply environment variable overrides to S3 configuration.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("MODELSTORE_S3_REGION") {
            self.region = val;
        }
        if let Ok(val) = std::env::var("MODELSTORE_S3_ENDPOINT") {
            self.endpoint = Some(val);
        }
        if let Ok(val) = std::env::var("MODELSTORE_S3_ACCESS_KEY_ID") {
            self.access_key_id = Some(val);
        }
        if let Ok(val) = std::env::var("MODELSTORE_S3_SECRET_ACCESS_KEY") {
            self.secret_access_key = Some(val);
        }
        if let Ok(val) = std::env::var("MODELSTORE_S3_SESSION_TOKEN") {
            self.session_token = Some(val);
        }
        if let Ok(val) = std::env::var("MODELSTORE_S3_MULTIPART_THRESHOLD") {
            if let Ok(v) = val.parse() {
                self.multipart_threshold = v;
            }
        }
        if let Ok(val) = std::env::var("MODELSTORE_S3_MULTIPART_CHUNK_SIZE") {
            if let Ok(v) = val.parse() {
                self.multipart_chunk_size = v;
            }
        }
        if let Ok(val) = std::env::var("MODELSTORE_S3_MAX_RETRIES") {
            if let Ok(v) = val.parse() {
                self.max_retries = v;
            }
        }
        if let Ok(val) = std::env::var("MODELSTORE_S3_CONNECT_TIMEOUT_MS") {
            if let Ok(v) = val.parse() {
                self.connect_timeout_ms = v;
            }
        }
        if let Ok(val) = std::env::var("MODELSTORE_S3_REQUEST_TIMEOUT_MS") {
            if let Ok(v) = val.parse() {
                self.request_timeout_ms = v;
            }
        }
        if let Ok(val) = std::env::var("MODELSTORE_S3_FORCE_PATH_STYLE") {
            if let Ok(v) = val.parse() {
                self.force_path_style = v;
            }
        }
        if let Ok(val) = std::env::var("MODELSTORE_S3_ALLOW_HTTP") {
            if let Ok(v) = val.parse() {
                self.allow_http = v;
            }
        }
        self
    }

    /// Validate S3 configuration.
    pub fn validate(&self) -> Result<()> {
        if self.region.is_empty() {
            return Err(StoreError::config("s3.region must not be empty"));
        }
        if self.multipart_chunk_size < 5 * 1024 * 1024 {
            return Err(StoreError::config(
                "s3.multipart_chunk_size must be at least 5 MB (S3 minimum)",
            ));
        }
        if self.multipart_chunk_size > 5 * 1024 * 1024 * 1024 {
            return Err(StoreError::config(
                "s3.multipart_chunk_size must be at most 5 GB (S3 maximum)",
            ));
        }
        if self.connect_timeout_ms == 0 {
            return Err(StoreError::config(
                "s3.connect_timeout_ms must be greater than 0",
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(StoreError::config(
                "s3.request_timeout_ms must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Location of the model served by the estimator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub bucket: String,
    pub key: String,
    // Optional folder prepended to `key`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

impl ModelConfig {
    /// Full object key of the model artifact.
    pub fn object_key(&self) -> String {
        crate::service::model_key(&self.key, self.dir.as_deref())
    }
}

// Delimited-text settings for tables crossing the storage boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub delimiter: char,
    // Token read back as a missing value, and written for missing cells.
    pub missing_value: String,
}

// Model artifact encoding options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    // Compression algorithm: "none", "lz4", or "zstd".
    pub compression: String,
    // Compression level (zstd only).
    pub compression_level: i32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendType::Local,
            base_path: PathBuf::from("./buckets"),
            s3: None,
        }
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            missing_value: "na".to_string(),
        }
    }
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            compression: "lz4".to_string(),
            compression_level: 3,
        }
    }
}

impl FromStr for ModelStoreConfig {
    type Err = StoreError;

    /// Parse configuration from a TOML string.
    fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s)
            .map_err(|e| StoreError::config_with_source("failed to parse TOML config", e))
    }
}

impl ModelStoreConfig {
    // Load configuration from a TOML file.
    //
    // # Errors
    //
    // Returns an error if the file cannot be read, parsed, or is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            StoreError::local_io_with_source(path, "failed to read config file", e)
        })?;
        let config: Self = content.parse()?;
        config.validate()?;
        Ok(config)
    }

    // Apply environment variable overrides.
    //
    // Environment variables are prefixed with `MODELSTORE_` and use
    // underscores to separate nested fields. For example:
    // - `MODELSTORE_STORAGE_BACKEND` overrides `storage.backend`
    // - `MODELSTORE_MODEL_BUCKET` overrides `model.bucket`
    // - `MODELSTORE_S3_REGION` overrides `storage.s3.region`
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        // Storage overrides
        if let Ok(val) = std::env::var("MODELSTORE_STORAGE_BACKEND") {
            match val.to_lowercase().as_str() {
                "local" => self.storage.backend = StorageBackendType::Local,
                "s3" => self.storage.backend = StorageBackendType::S3,
                "memory" => self.storage.backend = StorageBackendType::Memory,
                _ => {} // ignore invalid values
            }
        }
        if let Ok(val) = std::env::var("MODELSTORE_STORAGE_BASE_PATH") {
            self.storage.base_path = PathBuf::from(val);
        }

        // S3 overrides - create S3Config if any S3 env vars are set
        if std::env::var("MODELSTORE_S3_REGION").is_ok()
            || std::env::var("MODELSTORE_S3_ENDPOINT").is_ok()
        {
            let s3_config = self.storage.s3.take().unwrap_or_default().with_env_overrides();
            self.storage.s3 = Some(s3_config);
        } else if let Some(s3_config) = self.storage.s3.take() {
            self.storage.s3 = Some(s3_config.with_env_overrides());
        }

        // Model overrides
        if let Ok(val) = std::env::var("MODELSTORE_MODEL_BUCKET") {
            self.model.bucket = val;
        }
        if let Ok(val) = std::env::var("MODELSTORE_MODEL_KEY") {
            self.model.key = val;
        }
        if let Ok(val) = std::env::var("MODELSTORE_MODEL_DIR") {
            self.model.dir = Some(val);
        }

        // Table overrides
        if let Ok(val) = std::env::var("MODELSTORE_TABLE_DELIMITER") {
            if let Ok(v) = val.parse() {
                self.table.delimiter = v;
            }
        }
        if let Ok(val) = std::env::var("MODELSTORE_TABLE_MISSING_VALUE") {
            self.table.missing_value = val;
        }

        // Artifact overrides
        if let Ok(val) = std::env::var("MODELSTORE_ARTIFACT_COMPRESSION") {
            self.artifact.compression = val;
        }
        if let Ok(val) = std::env::var("MODELSTORE_ARTIFACT_COMPRESSION_LEVEL") {
            if let Ok(v) = val.parse() {
                self.artifact.compression_level = v;
            }
        }

        self
    }

    // Validate all configuration values.
    //
    // # Errors
    //
    // Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.storage.backend == StorageBackendType::Local
            && self.storage.base_path.as_os_str().is_empty()
        {
            return Err(StoreError::config(
                "storage.base_path must not be empty for the local backend",
            ));
        }

        // S3 validation (when S3 backend is selected)
        if self.storage.backend == StorageBackendType::S3 {
            match &self.storage.s3 {
                Some(s3_config) => s3_config.validate()?,
                None => {
                    return Err(StoreError::config(
                        "storage.s3 configuration is required when backend is 's3'",
                    ));
                }
            }
        }

        if !self.table.delimiter.is_ascii() {
            return Err(StoreError::config("table.delimiter must be an ASCII character"));
        }

        let valid_compression = ["none", "lz4", "zstd"];
        if !valid_compression.contains(&self.artifact.compression.as_str()) {
            return Err(StoreError::config(format!(
                "artifact.compression must be one of: {}",
                valid_compression.join(", ")
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = ModelStoreConfig::default();

        assert_eq!(config.storage.backend, StorageBackendType::Local);
        assert_eq!(config.storage.base_path, PathBuf::from("./buckets"));
        assert!(config.storage.s3.is_none());

        assert!(config.model.bucket.is_empty());
        assert!(config.model.dir.is_none());

        assert_eq!(config.table.delimiter, ',');
        assert_eq!(config.table.missing_value, "na");

        assert_eq!(config.artifact.compression, "lz4");
        assert_eq!(config.artifact.compression_level, 3);
    }

    #[test]
    fn test_default_validates() {
        let config = ModelStoreConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_str_empty() {
        let config: ModelStoreConfig = "".parse().unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_str_full() {
        let toml = r#"
            [storage]
            backend = "s3"

            [storage.s3]
            region = "eu-west-1"
            endpoint = "http://localhost:9000"
            force_path_style = true
            allow_http = true

            [model]
            bucket = "models"
            key = "model.bin"
            dir = "prod"

            [table]
            delimiter = ";"
            missing_value = "NA"

            [artifact]
            compression = "zstd"
            compression_level = 9
        "#;

        let config: ModelStoreConfig = toml.parse().unwrap();
        assert!(config.validate().is_ok());

        assert_eq!(config.storage.backend, StorageBackendType::S3);
        let s3 = config.storage.s3.as_ref().unwrap();
        assert_eq!(s3.region, "eu-west-1");
        assert_eq!(s3.endpoint.as_deref(), Some("http://localhost:9000"));
        assert!(s3.force_path_style);
        assert!(s3.allow_http);
        // Unset fields keep their defaults
        assert_eq!(s3.max_retries, 5);

        assert_eq!(config.model.object_key(), "prod/model.bin");
        assert_eq!(config.table.delimiter, ';');
        assert_eq!(config.table.missing_value, "NA");
        assert_eq!(config.artifact.compression, "zstd");
        assert_eq!(config.artifact.compression_level, 9);
    }

    #[test]
    fn test_from_str_invalid_toml() {
        let result: std::result::Result<ModelStoreConfig, _> = "invalid = [".parse();
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [storage]
            base_path = "/tmp/buckets"
            "#
        )
        .unwrap();

        let config = ModelStoreConfig::from_file(file.path()).unwrap();
        assert_eq!(config.storage.base_path, PathBuf::from("/tmp/buckets"));
    }

    #[test]
    fn test_from_file_not_found() {
        let result = ModelStoreConfig::from_file("/nonexistent/modelstore.toml");
        assert!(matches!(result, Err(StoreError::LocalIo { .. })));
    }

    #[test]
    fn test_model_object_key_without_dir() {
        let model = ModelConfig {
            bucket: "models".to_string(),
            key: "model.bin".to_string(),
            dir: None,
        };
        assert_eq!(model.object_key(), "model.bin");

        let model = ModelConfig {
            dir: Some("prod/".to_string()),
            ..model
        };
        assert_eq!(model.object_key(), "prod/model.bin");
    }

    #[test]
    fn test_validate_invalid_compression() {
        let mut config = ModelStoreConfig::default();
        config.artifact.compression = "gzip".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_non_ascii_delimiter() {
        let mut config = ModelStoreConfig::default();
        config.table.delimiter = '§';
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_storage_backend_s3_requires_s3_config() {
        let mut config = ModelStoreConfig::default();
        config.storage.backend = StorageBackendType::S3;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("s3 configuration is required"));
    }

    #[test]
    fn test_s3_config_validate_chunk_size_too_small() {
        let config = S3Config {
            multipart_chunk_size: 1024,
            ..Default::default()
        };
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("5 MB"));
    }

    // Helper to clear all MODELSTORE_ environment variables for test isolation
    fn clear_env_vars() {
        for (key, _) in std::env::vars() {
            if key.starts_with("MODELSTORE_") {
                std::env::remove_var(&key);
            }
        }
    }

    // Environment variable tests are combined into a single test to avoid
    // race conditions when tests run in parallel, since env vars are global state.
    #[test]
    fn test_env_overrides() {
        clear_env_vars();

        std::env::set_var("MODELSTORE_STORAGE_BACKEND", "memory");
        std::env::set_var("MODELSTORE_MODEL_BUCKET", "env-models");
        std::env::set_var("MODELSTORE_MODEL_KEY", "env.bin");
        std::env::set_var("MODELSTORE_TABLE_MISSING_VALUE", "?");
        std::env::set_var("MODELSTORE_S3_REGION", "ap-south-1");

        let config = ModelStoreConfig::default().with_env_overrides();

        assert_eq!(config.storage.backend, StorageBackendType::Memory);
        assert_eq!(config.model.bucket, "env-models");
        assert_eq!(config.model.key, "env.bin");
        assert_eq!(config.table.missing_value, "?");
        assert_eq!(config.storage.s3.unwrap().region, "ap-south-1");

        clear_env_vars();

        // Invalid values are ignored
        std::env::set_var("MODELSTORE_ARTIFACT_COMPRESSION_LEVEL", "high");
        std::env::set_var("MODELSTORE_STORAGE_BACKEND", "tape");

        let config = ModelStoreConfig::default().with_env_overrides();
        assert_eq!(config.artifact.compression_level, 3);
        assert_eq!(config.storage.backend, StorageBackendType::Local);

        clear_env_vars();
    }

    #[test]
    fn test_serialize_roundtrip() {
        let original = ModelStoreConfig::default();
        let toml_str = toml::to_string(&original).unwrap();
        let parsed: ModelStoreConfig = toml_str.parse().unwrap();

        assert_eq!(original.storage.base_path, parsed.storage.base_path);
        assert_eq!(original.table.missing_value, parsed.table.missing_value);
        assert_eq!(original.artifact.compression, parsed.artifact.compression);
    }
}
