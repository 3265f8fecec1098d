// rust/modelstore-core/src/error.rs

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {

    #[error("object not found: {bucket}/{key}")]
    NotFound {
        bucket: String,
        key: String,
    },

    #[error("{operation} failed for {bucket}/{key}: {message}")]
    Backend {
        operation: &'static str,
        bucket: String,
        key: String,
        message: String,
        #[source]
        source: Option<object_store::Error>,
    },

    #[error("Model artifact '{key}' could not be decoded: {message}")]
    Deserialization {
        key: String,
        message: String,
    },

    #[error("Model artifact could not be encoded: {message}")]
    Serialization {
        message: String,
    },

    #[error("Object '{key}' is not valid UTF-8 text")]
    Decode {
        key: String,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("Local I/O error at '{path}': {message}")]
    LocalIo {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Table error: {message}")]
    Table {
        message: String,
        #[source]
        source: Option<csv::Error>,
    },

    #[error("Prediction failed: {message}")]
    Prediction {
        message: String,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<StoreError>,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;

// Convenience constructors
impl StoreError {

    pub fn not_found(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    pub fn backend(
        operation: &'static str,
        bucket: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Backend {
            operation,
            bucket: bucket.into(),
            key: key.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn backend_with_source(
        operation: &'static str,
        bucket: impl Into<String>,
        key: impl Into<String>,
        source: object_store::Error,
    ) -> Self {
        Self::Backend {
            operation,
            bucket: bucket.into(),
            key: key.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    pub fn deserialization(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Deserialization {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    pub fn local_io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::LocalIo {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn local_io_with_source(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::LocalIo {
            path: path.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn table(message: impl Into<String>) -> Self {
        Self::Table {
            message: message.into(),
            source: None,
        }
    }

    pub fn table_with_source(message: impl Into<String>, source: csv::Error) -> Self {
        Self::Table {
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn prediction(message: impl Into<String>) -> Self {
        Self::Prediction {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Wraps this error with the name of the operation that observed it.
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, skipping any context layers.
    pub fn root(&self) -> &StoreError {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// True when the backend reported that no object matched.
    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Self::NotFound { .. })
    }
}

/// Adds operation context to fallible results.
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(context))
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| e.context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = StoreError::not_found("models", "prod/model.bin");
        assert_eq!(err.to_string(), "object not found: models/prod/model.bin");
    }

    #[test]
    fn test_context_keeps_not_found_visible() {
        let err = StoreError::not_found("models", "prod/model.bin")
            .context("resolve")
            .context("load_model");

        assert!(err.is_not_found());
        assert!(err.to_string().starts_with("load_model: resolve: "));
    }

    #[test]
    fn test_backend_is_not_not_found() {
        let err = StoreError::backend("get", "models", "a", "connection reset");
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_result_ext_with_context() {
        let result: Result<()> = Err(StoreError::prediction("bad input"));
        let err = result
            .with_context(|| format!("predict with {}", "linear"))
            .unwrap_err();

        assert_eq!(err.to_string(), "predict with linear: Prediction failed: bad input");
        assert!(matches!(err.root(), StoreError::Prediction { .. }));
    }
}
