//! Object store backends.
//!
//! [`ObjectBackend`] is the narrow set of store operations the rest of the
//! crate needs. [`S3Backend`] talks to any S3-compatible service through
//! `aws-sdk-s3`; [`MemoryBackend`] keeps everything in process.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::BackendError;

pub mod memory;
pub mod s3;

pub use memory::{MemoryBackend, StoredObject};
pub use s3::S3Backend;

/// Operations against an S3-compatible object store.
#[async_trait]
pub trait ObjectBackend: Send + Sync + fmt::Debug {
    /// Whether `bucket` exists.
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, BackendError>;

    /// Create `bucket` in `region`.
    async fn make_bucket(&self, bucket: &str, region: &str) -> Result<(), BackendError>;

    /// Replace the access policy of `bucket` with the JSON document `policy`.
    async fn set_bucket_policy(&self, bucket: &str, policy: &str) -> Result<(), BackendError>;

    /// Write `body` to `bucket/key`, recording `content_type`.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), BackendError>;

    /// Delete `bucket/key`.
    async fn remove_object(&self, bucket: &str, key: &str) -> Result<(), BackendError>;
}
