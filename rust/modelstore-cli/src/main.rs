//! Model Store command line driver
//!
//! Works against the buckets described by a configuration file (or the
//! defaults: local buckets under `./buckets`).
//!
//! # Usage
//!
//! ```bash
//! # Is anything stored under a prefix?
//! modelstore exists models prod/
//!
//! # Upload a file and remove the local copy
//! modelstore put model.bin models prod/model.bin --remove
//!
//! # Build a model artifact from a JSON description, then score a CSV file
//! modelstore pack-model linear.json model.bin
//! modelstore --config modelstore.toml predict input.csv --output scores.csv
//! ```

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use modelstore_core::{ModelStoreConfig, StorageService};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Model Store
#[derive(Parser, Debug)]
#[command(name = "modelstore")]
#[command(about = "Bucket, table and model operations for model serving")]
struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check whether any object key starts with a prefix
    Exists { bucket: String, prefix: String },

    /// List objects whose key starts with a prefix
    Ls {
        bucket: String,
        #[arg(default_value = "")]
        prefix: String,
    },

    /// Print an object to stdout
    Cat {
        bucket: String,
        key: String,
        /// Decode the content as UTF-8 text
        #[arg(long)]
        text: bool,
        /// Require an exact key instead of a prefix
        #[arg(long)]
        exact: bool,
    },

    /// Upload a local file
    Put {
        file: PathBuf,
        bucket: String,
        key: String,
        /// Delete the local file after a successful upload
        #[arg(long)]
        remove: bool,
    },

    /// Delete an object
    Rm { bucket: String, key: String },

    /// Create a folder marker
    Mkdir { bucket: String, folder: String },

    /// Read a stored table and print it as delimited text
    ReadTable {
        bucket: String,
        key: String,
        /// Print at most this many rows
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Build a model artifact from a JSON model description
    PackModel { description: PathBuf, output: PathBuf },

    /// Score a local CSV file with the configured model
    Predict {
        input: PathBuf,
        /// Bucket holding the model (defaults to `model.bucket`)
        #[arg(long)]
        bucket: Option<String>,
        /// Model key (defaults to `model.dir`/`model.key`)
        #[arg(long)]
        key: Option<String>,
        /// Write the scored table here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> modelstore_core::Result<ModelStoreConfig> {
    let config = match path {
        Some(path) => ModelStoreConfig::from_file(path)?,
        None => ModelStoreConfig::default(),
    };
    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let filter = tracing_subscriber::filter::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::filter::EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(args.config.as_ref())?;
    tracing::debug!("Configuration: {:?}", config);

    // Packing a model needs no storage access
    if let Command::PackModel { description, output } = &args.command {
        commands::pack_model(description, output, &config.artifact)?;
        return Ok(());
    }

    let service = StorageService::from_config(&config)?;

    match args.command {
        Command::Exists { bucket, prefix } => commands::exists(&service, &bucket, &prefix).await?,
        Command::Ls { bucket, prefix } => commands::list(&service, &bucket, &prefix).await?,
        Command::Cat {
            bucket,
            key,
            text,
            exact,
        } => commands::cat(&service, &bucket, &key, text, exact).await?,
        Command::Put {
            file,
            bucket,
            key,
            remove,
        } => commands::put(&service, &file, &bucket, &key, remove).await?,
        Command::Rm { bucket, key } => commands::remove(&service, &bucket, &key).await?,
        Command::Mkdir { bucket, folder } => commands::mkdir(&service, &bucket, &folder).await?,
        Command::ReadTable { bucket, key, limit } => {
            commands::read_table(&service, &bucket, &key, limit, &config.table).await?
        }
        Command::Predict {
            input,
            bucket,
            key,
            output,
        } => {
            let bucket = bucket.unwrap_or_else(|| config.model.bucket.clone());
            let key = key.unwrap_or_else(|| config.model.object_key());
            commands::predict(service, &bucket, &key, &input, output.as_deref(), &config.table).await?
        }
        Command::PackModel { .. } => {}
    }

    Ok(())
}
