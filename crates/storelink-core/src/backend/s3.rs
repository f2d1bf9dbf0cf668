//! Backend over `aws-sdk-s3`.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::create_bucket::CreateBucketError;
use aws_sdk_s3::operation::head_bucket::HeadBucketError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use bytes::Bytes;
use tracing::debug;

use super::ObjectBackend;
use crate::config::StorageConfig;
use crate::error::BackendError;

/// Region in which buckets are created without a location constraint.
const DEFAULT_REGION: &str = "us-east-1";

/// An S3-compatible store reached over HTTP.
#[derive(Debug, Clone)]
pub struct S3Backend {
    client: Client,
}

impl S3Backend {
    /// Wrap an existing client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a path-style client for the internal endpoint of `config`.
    #[must_use]
    pub fn from_config(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "storelink",
        );
        let s3_config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .endpoint_url(config.internal_endpoint().base_url())
            .force_path_style(true)
            .build();
        Self::new(Client::from_conf(s3_config))
    }

    /// The underlying SDK client.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }
}

fn request_error<E: std::error::Error>(operation: &'static str, err: E) -> BackendError {
    BackendError::Request {
        operation,
        message: DisplayErrorContext(err).to_string(),
    }
}

fn service_code<E, R>(err: &SdkError<E, R>) -> Option<String>
where
    E: ProvideErrorMetadata,
{
    err.as_service_error()
        .and_then(ProvideErrorMetadata::code)
        .map(ToOwned::to_owned)
}

#[async_trait]
impl ObjectBackend for S3Backend {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, BackendError> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                let not_found = err
                    .as_service_error()
                    .is_some_and(HeadBucketError::is_not_found)
                    || err
                        .raw_response()
                        .is_some_and(|resp| resp.status().as_u16() == 404);
                if not_found {
                    Ok(false)
                } else {
                    Err(request_error("HeadBucket", err))
                }
            }
        }
    }

    async fn make_bucket(&self, bucket: &str, region: &str) -> Result<(), BackendError> {
        let mut request = self.client.create_bucket().bucket(bucket);
        if region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }
        match request.send().await {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(CreateBucketError::is_bucket_already_owned_by_you) =>
            {
                debug!(bucket, "bucket already owned by caller");
                Ok(())
            }
            Err(err) => Err(request_error("CreateBucket", err)),
        }
    }

    async fn set_bucket_policy(&self, bucket: &str, policy: &str) -> Result<(), BackendError> {
        self.client
            .put_bucket_policy()
            .bucket(bucket)
            .policy(policy)
            .send()
            .await
            .map_err(|err| request_error("PutBucketPolicy", err))?;
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), BackendError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|err| {
                if service_code(&err).as_deref() == Some("NoSuchBucket") {
                    BackendError::NoSuchBucket {
                        bucket: bucket.to_owned(),
                    }
                } else {
                    request_error("PutObject", err)
                }
            })?;
        Ok(())
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> Result<(), BackendError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| match service_code(&err).as_deref() {
                Some("NoSuchKey") => BackendError::NoSuchKey {
                    bucket: bucket.to_owned(),
                    key: key.to_owned(),
                },
                Some("NoSuchBucket") => BackendError::NoSuchBucket {
                    bucket: bucket.to_owned(),
                },
                _ => request_error("DeleteObject", err),
            })?;
        Ok(())
    }
}
