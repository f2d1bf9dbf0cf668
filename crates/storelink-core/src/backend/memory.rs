//! In-process backend.
//!
//! Used for dry runs of the CLI and throughout the test suite. Every call
//! optionally sleeps for a configured latency, which lets tests overlap
//! concurrent operations.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tracing::debug;

use super::ObjectBackend;
use crate::error::BackendError;

/// An object as stored by [`MemoryBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Object bytes.
    pub body: Bytes,
    /// Content type recorded at upload.
    pub content_type: String,
}

#[derive(Debug, Default)]
struct MemoryBucket {
    region: String,
    policy: Option<String>,
    objects: DashMap<String, StoredObject>,
}

/// A backend that keeps buckets and objects in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    buckets: DashMap<String, MemoryBucket>,
    latency: Option<Duration>,
    make_bucket_calls: AtomicUsize,
}

impl MemoryBackend {
    /// An empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every operation by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Pre-create `bucket` without a policy.
    #[must_use]
    pub fn with_bucket(self, bucket: impl Into<String>) -> Self {
        self.buckets.insert(bucket.into(), MemoryBucket::default());
        self
    }

    /// A copy of the stored object, if present.
    #[must_use]
    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        let bucket = self.buckets.get(bucket)?;
        bucket.objects.get(key).map(|o| o.value().clone())
    }

    /// Number of objects in `bucket`.
    #[must_use]
    pub fn object_count(&self, bucket: &str) -> usize {
        self.buckets.get(bucket).map_or(0, |b| b.objects.len())
    }

    /// The policy last set on `bucket`.
    #[must_use]
    pub fn policy(&self, bucket: &str) -> Option<String> {
        self.buckets.get(bucket).and_then(|b| b.policy.clone())
    }

    /// The region `bucket` was created in (empty for pre-created buckets).
    #[must_use]
    pub fn bucket_region(&self, bucket: &str) -> Option<String> {
        self.buckets.get(bucket).map(|b| b.region.clone())
    }

    /// How many times `make_bucket` has been called.
    #[must_use]
    pub fn make_bucket_calls(&self) -> usize {
        self.make_bucket_calls.load(Ordering::SeqCst)
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn no_such_bucket(bucket: &str) -> BackendError {
        BackendError::NoSuchBucket {
            bucket: bucket.to_owned(),
        }
    }
}

#[async_trait]
impl ObjectBackend for MemoryBackend {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, BackendError> {
        self.delay().await;
        Ok(self.buckets.contains_key(bucket))
    }

    async fn make_bucket(&self, bucket: &str, region: &str) -> Result<(), BackendError> {
        self.make_bucket_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        match self.buckets.entry(bucket.to_owned()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(BackendError::Request {
                operation: "CreateBucket",
                message: format!("bucket {bucket} already exists"),
            }),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(MemoryBucket {
                    region: region.to_owned(),
                    ..MemoryBucket::default()
                });
                debug!(bucket, region, "memory bucket created");
                Ok(())
            }
        }
    }

    async fn set_bucket_policy(&self, bucket: &str, policy: &str) -> Result<(), BackendError> {
        self.delay().await;
        let mut entry = self
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| Self::no_such_bucket(bucket))?;
        entry.policy = Some(policy.to_owned());
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), BackendError> {
        self.delay().await;
        let entry = self
            .buckets
            .get(bucket)
            .ok_or_else(|| Self::no_such_bucket(bucket))?;
        entry.objects.insert(
            key.to_owned(),
            StoredObject {
                body,
                content_type: content_type.to_owned(),
            },
        );
        Ok(())
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> Result<(), BackendError> {
        self.delay().await;
        let entry = self
            .buckets
            .get(bucket)
            .ok_or_else(|| Self::no_such_bucket(bucket))?;
        entry
            .objects
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| BackendError::NoSuchKey {
                bucket: bucket.to_owned(),
                key: key.to_owned(),
            })
    }
}
