// rust/modelstore-core/src/estimator.rs

//! Serving predictions from a stored model.
//!
//! A [`ModelEstimator`] is bound to one model key. The model is fetched and
//! decoded on first use and then kept for the lifetime of the estimator.
//! Concurrent first calls share a single load. A load that is cancelled
//! part way leaves the estimator as it was before the load started.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::config::ModelConfig;
use crate::error::{Result, ResultExt};
use crate::model::{Model, Predictions};
use crate::service::StorageService;
use crate::storage::{UploadOptions, UploadReceipt};
use crate::table::Table;

/// Where an estimator is in its model lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelStatus {
    Unloaded,
    Loading,
    Loaded,
    Failed,
}

impl fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unloaded => "unloaded",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

enum ModelState {
    Unloaded,
    Loaded(Arc<dyn Model>),
    // Message of the last failed load; the next load retries.
    Failed(String),
}

impl ModelState {
    fn status(&self) -> ModelStatus {
        match self {
            Self::Unloaded => ModelStatus::Unloaded,
            Self::Loaded(_) => ModelStatus::Loaded,
            Self::Failed(_) => ModelStatus::Failed,
        }
    }

    fn loaded(&self) -> Option<Arc<dyn Model>> {
        match self {
            Self::Loaded(model) => Some(model.clone()),
            _ => None,
        }
    }
}

/// Lazily loads one model and serves predictions from it.
pub struct ModelEstimator {
    bucket: String,
    model_key: String,
    service: StorageService,
    state: RwLock<ModelState>,
    /// Held for the duration of a load; a held guard reads as `Loading`.
    load_guard: Mutex<()>,
}

impl ModelEstimator {
    pub fn new(service: StorageService, bucket: impl Into<String>, model_key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            model_key: model_key.into(),
            service,
            state: RwLock::new(ModelState::Unloaded),
            load_guard: Mutex::new(()),
        }
    }

    pub fn from_config(service: StorageService, config: &ModelConfig) -> Self {
        Self::new(service, &config.bucket, config.object_key())
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn model_key(&self) -> &str {
        &self.model_key
    }

    /// True if any object in the estimator's bucket starts with `key`.
    pub async fn is_model_present(&self, key: &str) -> Result<bool> {
        let present = self
            .service
            .key_available(&self.bucket, key)
            .await
            .context("is_model_present")?;
        if !present {
            tracing::error!("Model '{}' not found in bucket '{}'", key, self.bucket);
        }
        Ok(present)
    }

    pub async fn state(&self) -> ModelStatus {
        let state = self.state.read().await;
        if state.loaded().is_none() && self.load_guard.try_lock().is_err() {
            return ModelStatus::Loading;
        }
        state.status()
    }

    /// Message of the last failed load, if the estimator is in `Failed`.
    pub async fn last_error(&self) -> Option<String> {
        match &*self.state.read().await {
            ModelState::Failed(message) => Some(message.clone()),
            _ => None,
        }
    }

    /// Returns the model, loading it on the first call.
    ///
    /// # Errors
    ///
    /// Returns the load error. The estimator stays usable and the next call
    /// tries again.
    pub async fn load_model(&self) -> Result<Arc<dyn Model>> {
        if let Some(model) = self.state.read().await.loaded() {
            return Ok(model);
        }

        let _guard = self.load_guard.lock().await;
        // Another caller may have finished loading while we waited
        if let Some(model) = self.state.read().await.loaded() {
            return Ok(model);
        }

        tracing::info!("Loading model {}/{}", self.bucket, self.model_key);

        match self.service.load_model(&self.bucket, &self.model_key, None).await {
            Ok(model) => {
                *self.state.write().await = ModelState::Loaded(model.clone());
                Ok(model)
            }
            Err(e) => {
                tracing::warn!("Failed to load model {}/{}: {}", self.bucket, self.model_key, e);
                *self.state.write().await = ModelState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Uploads a local model artifact to the estimator's key.
    ///
    /// An already loaded model is not replaced.
    pub async fn save_model(&self, local_path: impl AsRef<Path>, remove: bool) -> Result<UploadReceipt> {
        let options = UploadOptions {
            delete_local_after: remove,
        };
        self.service
            .upload_file(local_path, &self.bucket, &self.model_key, options)
            .await
            .context("save_model")
    }

    /// Scores `table` with the model, loading it if needed.
    pub async fn predict(&self, table: &Table) -> Result<Predictions> {
        let model = self.load_model().await.context("predict")?;
        let predictions = model.predict(table).context("predict")?;
        tracing::debug!(
            "Predicted {} rows with {} model",
            predictions.len(),
            model.kind()
        );
        Ok(predictions)
    }
}

impl fmt::Debug for ModelEstimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelEstimator")
            .field("bucket", &self.bucket)
            .field("model_key", &self.model_key)
            .finish_non_exhaustive()
    }
}
