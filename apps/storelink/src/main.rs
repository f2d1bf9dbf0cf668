//! storelink - command-line front end for the storage access layer.
//!
//! Provisions the configured buckets, uploads files, resolves references to
//! URLs, deletes objects, and rewrites JSON documents read from stdin.
//!
//! # Usage
//!
//! ```text
//! STORAGE_ENDPOINT=localhost:9000 STORAGE_ACCESS_KEY=minioadmin \
//! STORAGE_SECRET_KEY=minioadmin STORAGE_PRIVATE_BUCKETS=secure-docs \
//! storelink upload secure-docs ./q1.pdf --content-type application/pdf
//!
//! echo '{"doc":"storage://secure-docs/q1.pdf"}' | storelink rewrite
//! ```
//!
//! Configuration is read from the `STORAGE_*` environment variables
//! documented on `StorageConfig::from_env`. `RUST_LOG` overrides the log
//! level when set.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use storelink_core::{
    MemoryBackend, ObjectBackend, ObjectStore, S3Backend, StorageConfig, UploadedFile,
};
use storelink_rewrite::{DEFAULT_MAX_FAN_OUT, DescriptorRegistry, ResponseRewriter, TypeDescriptor};
use tokio::io::AsyncReadExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Field name recorded on files uploaded from the command line.
const CLI_FIELD: &str = "file";

#[derive(Parser)]
#[command(name = "storelink")]
#[command(
    version,
    about = "Bucket provisioning, uploads and signed URLs for S3-compatible storage",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Use an in-process store instead of the configured endpoint
    #[arg(long, global = true)]
    memory: bool,

    /// Log level (error, warn, info, debug, trace); defaults to STORAGE_LOG_LEVEL
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create missing buckets and apply their policies
    Provision,

    /// Upload a local file
    Upload {
        /// Destination bucket
        bucket: String,

        /// File to upload
        file: PathBuf,

        /// Object name (defaults to <millis>-<file name>)
        #[arg(long)]
        name: Option<String>,

        /// Content type recorded with the object
        #[arg(long, default_value = "application/octet-stream")]
        content_type: String,
    },

    /// Print a URL for an object
    Resolve {
        /// Bucket name
        bucket: String,

        /// Object name
        object: String,
    },

    /// Delete an object
    Delete {
        /// Bucket name
        bucket: String,

        /// Object name
        object: String,
    },

    /// Rewrite references in a JSON document read from stdin
    Rewrite {
        /// Field whose values are bucket/object references (repeatable)
        #[arg(long = "field")]
        fields: Vec<String>,

        /// Bucket assumed for bare object names in --field fields
        #[arg(long)]
        default_bucket: Option<String>,

        /// Maximum references resolved concurrently per level
        #[arg(long, default_value_t = DEFAULT_MAX_FAN_OUT)]
        max_fan_out: usize,
    },
}

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to `log_level`.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Build the store, backed by S3 or by memory.
fn build_store(mut config: StorageConfig, memory: bool) -> Result<Arc<ObjectStore>> {
    let backend: Arc<dyn ObjectBackend> = if memory {
        if config.access_key.is_empty() {
            config.access_key = "memory".to_owned();
        }
        if config.secret_key.is_empty() {
            config.secret_key = "memory".to_owned();
        }
        Arc::new(MemoryBackend::new())
    } else {
        Arc::new(S3Backend::from_config(&config))
    };

    let store = ObjectStore::new(config, backend).context("invalid storage configuration")?;
    Ok(Arc::new(store))
}

fn build_registry(fields: Vec<String>, default_bucket: Option<String>) -> DescriptorRegistry {
    if fields.is_empty() {
        return DescriptorRegistry::new();
    }
    let descriptor = fields
        .into_iter()
        .fold(TypeDescriptor::new("plain"), |d, field| match &default_bucket {
            Some(bucket) => d.reference_field_in(field, bucket.clone()),
            None => d.reference_field(field),
        });
    DescriptorRegistry::new().with_plain_fields(descriptor)
}

async fn upload(
    store: &ObjectStore,
    bucket: &str,
    path: PathBuf,
    name: Option<String>,
    content_type: String,
) -> Result<()> {
    let data = tokio::fs::read(&path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let original_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))?;

    let file = UploadedFile::new(CLI_FIELD, original_name, content_type, data);
    let reference = store.upload(&file, bucket, name.as_deref()).await?;
    let url = store.resolve(&reference)?;

    println!("{}", reference.to_uri());
    println!("{url}");
    Ok(())
}

async fn rewrite(rewriter: ResponseRewriter) -> Result<()> {
    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("failed to read stdin")?;
    let document: serde_json::Value =
        serde_json::from_str(&input).context("stdin is not valid JSON")?;

    let rewritten = rewriter.rewrite_json(document).await?;
    println!("{}", serde_json::to_string_pretty(&rewritten)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = StorageConfig::from_env();

    let log_level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    init_tracing(&log_level)?;

    info!(
        endpoint = %config.internal_endpoint(),
        memory = cli.memory,
        "starting storelink"
    );
    let store = build_store(config, cli.memory)?;

    match cli.command {
        Commands::Provision => {
            store.init().await.context("bucket provisioning failed")?;
            println!("provisioned {} bucket(s)", store.config().buckets.len());
        }
        Commands::Upload {
            bucket,
            file,
            name,
            content_type,
        } => upload(&store, &bucket, file, name, content_type).await?,
        Commands::Resolve { bucket, object } => {
            println!("{}", store.presigned_url(&bucket, &object)?);
        }
        Commands::Delete { bucket, object } => {
            store.delete(&bucket, &object).await?;
            println!("deleted {bucket}/{object}");
        }
        Commands::Rewrite {
            fields,
            default_bucket,
            max_fan_out,
        } => {
            let registry = build_registry(fields, default_bucket);
            let rewriter =
                ResponseRewriter::new(store, registry).with_max_fan_out(max_fan_out);
            rewrite(rewriter).await?;
        }
    }

    Ok(())
}
