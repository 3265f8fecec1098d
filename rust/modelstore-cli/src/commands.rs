//! Subcommand implementations.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use serde::Deserialize;

use modelstore_core::config::{ArtifactConfig, TableConfig};
use modelstore_core::{
    encode_artifact, read_csv, write_csv, ArtifactOptions, LinearModel, ModelEstimator,
    ModelSchema, ObjectBackend, ObjectContent, ReadOptions, StorageService, StoreError, TableFormat,
    UploadOptions,
};

type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub async fn exists(service: &StorageService, bucket: &str, prefix: &str) -> CliResult {
    let found = service.key_available(bucket, prefix).await?;
    println!("{found}");
    Ok(())
}

pub async fn list(service: &StorageService, bucket: &str, prefix: &str) -> CliResult {
    let objects = service.resolver().list(bucket, prefix).await?;
    for object in &objects {
        let modified = object
            .meta
            .last_modified
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{:>12}  {}  {}", object.meta.size, modified, object.key);
    }
    tracing::info!("{} objects under {}/{}", objects.len(), bucket, prefix);
    Ok(())
}

pub async fn cat(service: &StorageService, bucket: &str, key: &str, text: bool, exact: bool) -> CliResult {
    let handle = if exact {
        service.resolver().resolve_exact(bucket, key).await?
    } else {
        service.resolve(bucket, key).await?
    };
    let options = if text { ReadOptions::text() } else { ReadOptions::bytes() };

    let content = service.reader().read(&handle, options).await?;
    let mut stdout = io::stdout().lock();
    match content {
        ObjectContent::Text(text) => stdout.write_all(text.as_bytes())?,
        other => stdout.write_all(&other.into_bytes())?,
    }
    stdout.flush()?;
    Ok(())
}

pub async fn put(service: &StorageService, file: &Path, bucket: &str, key: &str, remove: bool) -> CliResult {
    let options = UploadOptions {
        delete_local_after: remove,
    };
    let receipt = service.upload_file(file, bucket, key, options).await?;
    println!(
        "uploaded {} bytes to {}/{}{}",
        receipt.size,
        receipt.bucket,
        receipt.key,
        if receipt.local_removed { " (local file removed)" } else { "" }
    );
    Ok(())
}

pub async fn remove(service: &StorageService, bucket: &str, key: &str) -> CliResult {
    service.backend().delete(bucket, key).await?;
    tracing::info!("Deleted {}/{}", bucket, key);
    Ok(())
}

pub async fn mkdir(service: &StorageService, bucket: &str, folder: &str) -> CliResult {
    if service.create_folder(bucket, folder).await? {
        println!("created {}/{}/", bucket, folder.trim_end_matches('/'));
    } else {
        println!("exists {}/{}/", bucket, folder.trim_end_matches('/'));
    }
    Ok(())
}

pub async fn read_table(
    service: &StorageService,
    bucket: &str,
    key: &str,
    limit: Option<usize>,
    table_config: &TableConfig,
) -> CliResult {
    let mut table = service.read_csv(bucket, key).await?;
    if let Some(limit) = limit {
        let rows = table.rows().iter().take(limit).cloned().collect();
        table = modelstore_core::Table::from_rows(table.columns().to_vec(), rows)?;
    }
    write_csv(&table, io::stdout().lock(), &TableFormat::from(table_config))?;
    Ok(())
}

/// JSON description of a linear model.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ModelDescription {
    Linear {
        inputs: Vec<String>,
        output: String,
        weights: Vec<f64>,
        #[serde(default)]
        bias: f64,
        #[serde(default)]
        threshold: Option<f64>,
        #[serde(default)]
        metadata: HashMap<String, String>,
    },
}

impl ModelDescription {
    fn build(self) -> modelstore_core::Result<(LinearModel, HashMap<String, String>)> {
        match self {
            Self::Linear {
                inputs,
                output,
                weights,
                bias,
                threshold,
                metadata,
            } => {
                let mut model = LinearModel::new(ModelSchema::new(inputs, output), weights, bias)?;
                if let Some(threshold) = threshold {
                    model = model.with_threshold(threshold);
                }
                Ok((model, metadata))
            }
        }
    }
}

pub fn pack_model(description: &Path, output: &Path, artifact: &ArtifactConfig) -> CliResult {
    let file = File::open(description)
        .map_err(|e| StoreError::local_io_with_source(description, "failed to open model description", e))?;
    let description: ModelDescription = serde_json::from_reader(file)?;
    let (model, metadata) = description.build()?;

    let mut options = ArtifactOptions::from(artifact);
    options.metadata = metadata;
    let bytes = encode_artifact(&model, &options)?;

    std::fs::write(output, &bytes)
        .map_err(|e| StoreError::local_io_with_source(output, "failed to write artifact", e))?;
    println!("wrote {} bytes to {}", bytes.len(), output.display());
    Ok(())
}

pub async fn predict(
    service: StorageService,
    bucket: &str,
    key: &str,
    input: &Path,
    output: Option<&Path>,
    table_config: &TableConfig,
) -> CliResult {
    if bucket.is_empty() || key.is_empty() {
        return Err(StoreError::config("no model configured: set [model] or pass --bucket and --key").into());
    }
    let format = TableFormat::from(table_config);

    let file = File::open(input)
        .map_err(|e| StoreError::local_io_with_source(input, "failed to open input table", e))?;
    let table = read_csv(file, &format)?;

    let estimator = ModelEstimator::new(service, bucket, key);
    let predictions = estimator.predict(&table).await?;
    let scored = predictions.to_table(&table)?;

    match output {
        Some(path) => {
            let file = File::create(path)
                .map_err(|e| StoreError::local_io_with_source(path, "failed to create output", e))?;
            write_csv(&scored, file, &format)?;
            tracing::info!("Wrote {} predictions to {}", predictions.len(), path.display());
        }
        None => write_csv(&scored, io::stdout().lock(), &format)?,
    }
    Ok(())
}
