//! The object store facade.
//!
//! [`ObjectStore`] ties configuration, a backend, bucket provisioning, the
//! URL signer and a clock together. It uploads objects, deletes them, and
//! turns `(bucket, object)` pairs into URLs a client can fetch.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use storelink_sign::{Endpoint, UrlSigner};
use tracing::{debug, info};

use crate::backend::ObjectBackend;
use crate::buckets::BucketManager;
use crate::clock::{Clock, SystemClock};
use crate::config::StorageConfig;
use crate::error::{BackendError, StoreError, StoreResult};
use crate::reference::ObjectReference;
use crate::upload::UploadedFile;

/// Storage access over one configured object store.
#[derive(Debug)]
pub struct ObjectStore {
    config: StorageConfig,
    backend: Arc<dyn ObjectBackend>,
    buckets: BucketManager,
    signer: UrlSigner,
    public_endpoint: Endpoint,
    clock: Arc<dyn Clock>,
}

impl ObjectStore {
    /// Create a store after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] when the configuration is invalid.
    pub fn new(config: StorageConfig, backend: Arc<dyn ObjectBackend>) -> StoreResult<Self> {
        config.validate()?;

        let buckets = BucketManager::new(
            Arc::clone(&backend),
            config.buckets.clone(),
            config.region.clone(),
        );
        let signer = UrlSigner::new(config.credentials(), config.region.clone());
        let public_endpoint = config.public_endpoint();

        debug!(
            internal = %config.internal_endpoint(),
            public = %public_endpoint,
            region = %config.region,
            "object store configured"
        );

        Ok(Self {
            config,
            backend,
            buckets,
            signer,
            public_endpoint,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// The bucket provisioner.
    #[must_use]
    pub fn bucket_manager(&self) -> &BucketManager {
        &self.buckets
    }

    /// The endpoint generated URLs point at.
    #[must_use]
    pub fn public_endpoint(&self) -> &Endpoint {
        &self.public_endpoint
    }

    /// Provision the managed buckets.
    ///
    /// # Errors
    ///
    /// See [`BucketManager::ensure_buckets`].
    pub async fn init(&self) -> StoreResult<()> {
        self.buckets.ensure_buckets().await
    }

    /// Upload `file` to `bucket`.
    ///
    /// Buckets are provisioned first if that has not happened yet. Without an
    /// explicit `object_name` the name is `<epoch millis>-<original name>`
    /// with whitespace replaced by `-`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Provisioning`] if bucket provisioning fails and
    /// [`StoreError::Upload`] if the write fails.
    pub async fn upload(
        &self,
        file: &UploadedFile,
        bucket: &str,
        object_name: Option<&str>,
    ) -> StoreResult<ObjectReference> {
        self.buckets.ensure_buckets().await?;

        let object = object_name.map_or_else(
            || generate_object_name(&file.original_name, self.clock.now()),
            ToOwned::to_owned,
        );

        self.backend
            .put_object(bucket, &object, file.data.clone(), &file.mime_type)
            .await
            .map_err(|source| StoreError::Upload {
                bucket: bucket.to_owned(),
                object: object.clone(),
                source,
            })?;

        info!(
            bucket,
            object = %object,
            size = file.size,
            content_type = %file.mime_type,
            "object uploaded"
        );
        Ok(ObjectReference::new(bucket, object))
    }

    /// A URL a client can GET `bucket/object` from.
    ///
    /// Objects in private buckets get a presigned URL valid for the configured
    /// expiry. Every other bucket gets a plain direct URL.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Resolution`] when a presigned URL cannot be
    /// built, e.g. for an empty object name.
    pub fn presigned_url(&self, bucket: &str, object: &str) -> StoreResult<String> {
        if !self.config.buckets.is_private(bucket) {
            return Ok(self.direct_url(bucket, object));
        }
        self.signer
            .presign_get(
                &self.public_endpoint,
                bucket,
                object,
                self.config.url_expiry_secs(),
                self.clock.now(),
            )
            .map_err(|source| StoreError::Resolution {
                bucket: bucket.to_owned(),
                object: object.to_owned(),
                source,
            })
    }

    /// Shorthand for [`ObjectStore::presigned_url`] on a reference.
    ///
    /// # Errors
    ///
    /// See [`ObjectStore::presigned_url`].
    pub fn resolve(&self, reference: &ObjectReference) -> StoreResult<String> {
        self.presigned_url(reference.bucket(), reference.object())
    }

    /// `<scheme>://<public host>[:<port>]/<bucket>/<object>`, unsigned.
    #[must_use]
    pub fn direct_url(&self, bucket: &str, object: &str) -> String {
        format!("{}/{bucket}/{object}", self.public_endpoint.base_url())
    }

    /// Delete `bucket/object`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the object or bucket does not
    /// exist, and [`StoreError::Backend`] for any other failure.
    pub async fn delete(&self, bucket: &str, object: &str) -> StoreResult<()> {
        self.backend
            .remove_object(bucket, object)
            .await
            .map_err(|err| match err {
                BackendError::NoSuchKey { .. } | BackendError::NoSuchBucket { .. } => {
                    StoreError::NotFound {
                        bucket: bucket.to_owned(),
                        object: object.to_owned(),
                    }
                }
                other => StoreError::Backend(other),
            })?;
        info!(bucket, object, "object deleted");
        Ok(())
    }
}

/// Name an uploaded object: `<epoch millis>-<name>` with every whitespace
/// character in `original_name` replaced by `-`.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use storelink_core::store::generate_object_name;
///
/// let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
/// assert_eq!(
///     generate_object_name("q1 report.pdf", now),
///     "1700000000123-q1-report.pdf"
/// );
/// ```
#[must_use]
pub fn generate_object_name(original_name: &str, now: DateTime<Utc>) -> String {
    let name: String = original_name
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect();
    format!("{}-{name}", now.timestamp_millis())
}
