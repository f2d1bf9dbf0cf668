//! Bucket provisioning.
//!
//! Every managed bucket is checked once per process. A missing bucket is
//! created in the configured region and given its visibility policy; an
//! existing bucket is left untouched. Concurrent callers share a single
//! provisioning pass, and a failed pass leaves the manager uninitialized so
//! the next call tries again. A bucket this manager created but could not
//! give a policy gets the policy on that next pass.

use std::sync::Arc;

use dashmap::DashSet;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::backend::ObjectBackend;
use crate::config::{BucketPartition, Visibility};
use crate::error::{BackendError, StoreError, StoreResult};
use crate::policy::BucketPolicy;

/// Ensures the configured buckets exist with the right policies.
#[derive(Debug)]
pub struct BucketManager {
    backend: Arc<dyn ObjectBackend>,
    partition: BucketPartition,
    region: String,
    initialized: OnceCell<()>,
    /// Created by this manager, policy not yet applied.
    missing_policy: DashSet<String>,
}

impl BucketManager {
    /// Create a manager for `partition`, creating buckets in `region`.
    pub fn new(
        backend: Arc<dyn ObjectBackend>,
        partition: BucketPartition,
        region: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            partition,
            region: region.into(),
            initialized: OnceCell::new(),
            missing_policy: DashSet::new(),
        }
    }

    /// Whether a provisioning pass has completed successfully.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.initialized()
    }

    /// The managed buckets.
    #[must_use]
    pub fn partition(&self) -> &BucketPartition {
        &self.partition
    }

    /// Provision all managed buckets, at most once per successful pass.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Provisioning`] naming the first bucket that could
    /// not be checked, created or given its policy.
    pub async fn ensure_buckets(&self) -> StoreResult<()> {
        self.initialized
            .get_or_try_init(|| self.provision_all())
            .await?;
        Ok(())
    }

    async fn provision_all(&self) -> StoreResult<()> {
        let mut created = 0usize;
        for (bucket, visibility) in self.partition.iter() {
            if self.provision(bucket, visibility).await? {
                created += 1;
            }
        }
        info!(
            private = self.partition.private.len(),
            public = self.partition.public.len(),
            created,
            "buckets provisioned"
        );
        Ok(())
    }

    async fn provision(&self, bucket: &str, visibility: Visibility) -> StoreResult<bool> {
        let fail = |source: BackendError| StoreError::Provisioning {
            bucket: bucket.to_owned(),
            source,
        };

        if self.backend.bucket_exists(bucket).await.map_err(fail)? {
            if self.missing_policy.contains(bucket) {
                self.apply_policy(bucket, visibility).await.map_err(fail)?;
                info!(bucket, %visibility, "bucket policy applied");
            } else {
                debug!(bucket, "bucket already exists");
            }
            return Ok(false);
        }

        self.backend
            .make_bucket(bucket, &self.region)
            .await
            .map_err(fail)?;
        self.missing_policy.insert(bucket.to_owned());
        self.apply_policy(bucket, visibility).await.map_err(fail)?;

        info!(bucket, %visibility, region = %self.region, "bucket created");
        Ok(true)
    }

    async fn apply_policy(&self, bucket: &str, visibility: Visibility) -> Result<(), BackendError> {
        let policy = BucketPolicy::for_bucket(bucket, visibility);
        self.backend
            .set_bucket_policy(bucket, &policy.to_json())
            .await?;
        self.missing_policy.remove(bucket);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;

    use super::*;
    use crate::backend::MemoryBackend;

    fn manager(backend: Arc<MemoryBackend>) -> BucketManager {
        BucketManager::new(
            backend,
            BucketPartition::new(["secure-docs"], ["public-assets"]),
            "us-east-1",
        )
    }

    #[tokio::test]
    async fn test_should_create_missing_buckets_with_policies() {
        let backend = Arc::new(MemoryBackend::new());
        let manager = manager(Arc::clone(&backend));

        manager.ensure_buckets().await.unwrap();

        assert!(manager.is_initialized());
        let private = backend.policy("secure-docs").expect("private policy");
        assert!(private.contains("\"Deny\""));
        let public = backend.policy("public-assets").expect("public policy");
        assert!(public.contains("\"Allow\""));
        assert_eq!(backend.bucket_region("secure-docs").as_deref(), Some("us-east-1"));
    }

    #[tokio::test]
    async fn test_should_leave_existing_buckets_untouched() {
        let backend = Arc::new(MemoryBackend::new().with_bucket("secure-docs"));
        let manager = manager(Arc::clone(&backend));

        manager.ensure_buckets().await.unwrap();

        assert!(backend.policy("secure-docs").is_none());
        assert!(backend.policy("public-assets").is_some());
        assert_eq!(backend.make_bucket_calls(), 1);
    }

    #[tokio::test]
    async fn test_should_provision_once_for_concurrent_callers() {
        let backend = Arc::new(MemoryBackend::new().with_latency(Duration::from_millis(20)));
        let manager = Arc::new(manager(Arc::clone(&backend)));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let manager = Arc::clone(&manager);
                tokio::spawn(async move { manager.ensure_buckets().await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(backend.make_bucket_calls(), 2);
    }

    #[tokio::test]
    async fn test_should_not_repeat_after_success() {
        let backend = Arc::new(MemoryBackend::new());
        let manager = manager(Arc::clone(&backend));

        manager.ensure_buckets().await.unwrap();
        manager.ensure_buckets().await.unwrap();

        assert_eq!(backend.make_bucket_calls(), 2);
    }

    /// Fails `bucket_exists` until switched on, and fails the first
    /// `policy_failures` policy calls.
    #[derive(Debug, Default)]
    struct FlakyBackend {
        inner: MemoryBackend,
        healthy: std::sync::atomic::AtomicBool,
        policy_failures: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl ObjectBackend for FlakyBackend {
        async fn bucket_exists(&self, bucket: &str) -> Result<bool, BackendError> {
            if self.healthy.load(std::sync::atomic::Ordering::SeqCst) {
                self.inner.bucket_exists(bucket).await
            } else {
                Err(BackendError::Request {
                    operation: "HeadBucket",
                    message: "connection refused".to_owned(),
                })
            }
        }

        async fn make_bucket(&self, bucket: &str, region: &str) -> Result<(), BackendError> {
            self.inner.make_bucket(bucket, region).await
        }

        async fn set_bucket_policy(&self, bucket: &str, policy: &str) -> Result<(), BackendError> {
            let failing = self
                .policy_failures
                .fetch_update(
                    std::sync::atomic::Ordering::SeqCst,
                    std::sync::atomic::Ordering::SeqCst,
                    |n| n.checked_sub(1),
                )
                .is_ok();
            if failing {
                return Err(BackendError::Request {
                    operation: "PutBucketPolicy",
                    message: "service unavailable".to_owned(),
                });
            }
            self.inner.set_bucket_policy(bucket, policy).await
        }

        async fn put_object(
            &self,
            bucket: &str,
            key: &str,
            body: Bytes,
            content_type: &str,
        ) -> Result<(), BackendError> {
            self.inner.put_object(bucket, key, body, content_type).await
        }

        async fn remove_object(&self, bucket: &str, key: &str) -> Result<(), BackendError> {
            self.inner.remove_object(bucket, key).await
        }
    }

    #[tokio::test]
    async fn test_should_retry_after_failed_pass() {
        let backend = Arc::new(FlakyBackend::default());
        let manager = BucketManager::new(
            Arc::clone(&backend) as Arc<dyn ObjectBackend>,
            BucketPartition::new(["secure-docs"], Vec::<String>::new()),
            "us-east-1",
        );

        let err = manager.ensure_buckets().await.unwrap_err();
        assert!(
            matches!(err, StoreError::Provisioning { ref bucket, .. } if bucket == "secure-docs")
        );
        assert!(!manager.is_initialized());

        backend
            .healthy
            .store(true, std::sync::atomic::Ordering::SeqCst);
        manager.ensure_buckets().await.unwrap();
        assert!(manager.is_initialized());
        assert_eq!(backend.inner.make_bucket_calls(), 1);
    }

    #[tokio::test]
    async fn test_should_apply_policy_on_retry_after_policy_failure() {
        let backend = Arc::new(FlakyBackend::default());
        backend
            .healthy
            .store(true, std::sync::atomic::Ordering::SeqCst);
        backend
            .policy_failures
            .store(1, std::sync::atomic::Ordering::SeqCst);
        let manager = BucketManager::new(
            Arc::clone(&backend) as Arc<dyn ObjectBackend>,
            BucketPartition::new(Vec::<String>::new(), ["public-assets"]),
            "us-east-1",
        );

        let err = manager.ensure_buckets().await.unwrap_err();
        assert!(
            matches!(err, StoreError::Provisioning { ref bucket, .. } if bucket == "public-assets")
        );
        assert!(!manager.is_initialized());
        assert!(backend.inner.policy("public-assets").is_none());

        manager.ensure_buckets().await.unwrap();
        assert!(manager.is_initialized());
        let policy = backend.inner.policy("public-assets").expect("policy after retry");
        assert!(policy.contains("\"Allow\""));
        assert_eq!(backend.inner.make_bucket_calls(), 1);
    }
}
