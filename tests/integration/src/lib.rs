//! Integration tests for storelink against an S3-compatible server.
//!
//! These tests require a running server (MinIO works) at `localhost:9000`.
//! They are marked `#[ignore]` so they don't run during normal `cargo test`.
//!
//! Run them with:
//! ```text
//! cargo test -p storelink-integration -- --ignored
//! ```
//!
//! | Variable | Default |
//! |----------|---------|
//! | `STORAGE_TEST_ENDPOINT` | `localhost:9000` |
//! | `STORAGE_TEST_ACCESS_KEY` | `minioadmin` |
//! | `STORAGE_TEST_SECRET_KEY` | `minioadmin` |

use std::sync::{Arc, Once};

use storelink_core::{BucketPartition, ObjectStore, S3Backend, StorageConfig};

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_owned())
}

/// Configuration pointing at the test server with the given buckets.
#[must_use]
pub fn storage_config(private: &[&str], public: &[&str]) -> StorageConfig {
    init_tracing();

    StorageConfig::builder()
        .endpoint(env_or("STORAGE_TEST_ENDPOINT", "localhost:9000"))
        .access_key(env_or("STORAGE_TEST_ACCESS_KEY", "minioadmin"))
        .secret_key(env_or("STORAGE_TEST_SECRET_KEY", "minioadmin"))
        .buckets(BucketPartition::new(
            private.iter().copied(),
            public.iter().copied(),
        ))
        .build()
}

/// A store over the test server.
#[must_use]
pub fn object_store(config: StorageConfig) -> Arc<ObjectStore> {
    let backend = Arc::new(S3Backend::from_config(&config));
    Arc::new(ObjectStore::new(config, backend).expect("valid test configuration"))
}

/// A raw S3 client for inspecting server state.
#[must_use]
pub fn s3_client() -> aws_sdk_s3::Client {
    S3Backend::from_config(&storage_config(&[], &[]))
        .client()
        .clone()
}

/// Generate a unique bucket name for a test.
#[must_use]
pub fn test_bucket_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

/// Delete all objects in a bucket, then delete the bucket.
pub async fn cleanup_bucket(client: &aws_sdk_s3::Client, bucket: &str) {
    let Ok(resp) = client.list_objects_v2().bucket(bucket).send().await else {
        return;
    };
    for obj in resp.contents() {
        if let Some(key) = obj.key() {
            let _ = client.delete_object().bucket(bucket).key(key).send().await;
        }
    }
    let _ = client.delete_bucket().bucket(bucket).send().await;
}

mod test_provision;
mod test_resolve;
mod test_upload;
