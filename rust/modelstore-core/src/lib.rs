// rust/modelstore-core/src/lib.rs

//! Model Store - Core Library
//!
//! Bucket access for model serving: resolving and reading objects,
//! uploading files, moving tables in and out of buckets as delimited text,
//! and loading versioned model artifacts behind a cached estimator.

pub mod config;
pub mod error;
pub mod storage;

// Re-export commonly used types for convenience
pub use config::ModelStoreConfig;
pub use error::{Result, ResultExt, StoreError};
pub use storage::{
    ObjectBackend, ObjectContent, ObjectHandle, ObjectMeta, ObjectReader, ObjectResolver,
    ObjectStoreBackend, ObjectSummary, ObjectWriter, ReadOptions, UploadOptions, UploadReceipt,
};

pub mod table;
pub use table::{read_csv, write_csv, Table, TableFormat};

pub mod model;
pub use model::{LinearModel, Model, ModelDecoder, ModelRegistry, ModelSchema, Predictions};

pub mod artifact;
pub use artifact::{decode_artifact, encode_artifact, ArtifactHeader, ArtifactOptions};

pub mod service;
pub use service::StorageService;

pub mod estimator;
pub use estimator::{ModelEstimator, ModelStatus};
