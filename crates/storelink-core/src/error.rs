//! Error types for the storage access layer.
//!
//! [`BackendError`] describes what went wrong talking to the object store.
//! [`StoreError`] wraps it with the bucket and object the caller asked about.

use storelink_sign::SignError;

/// Failures reported by an [`ObjectBackend`](crate::backend::ObjectBackend).
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The bucket does not exist.
    #[error("bucket does not exist: {bucket}")]
    NoSuchBucket {
        /// Bucket name.
        bucket: String,
    },

    /// The object does not exist.
    #[error("object does not exist: {bucket}/{key}")]
    NoSuchKey {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
    },

    /// Any other failure, carrying the store's own message.
    #[error("{operation} failed: {message}")]
    Request {
        /// The operation that failed (e.g. `"PutObject"`).
        operation: &'static str,
        /// Human-readable failure description.
        message: String,
    },
}

/// Errors surfaced by [`ObjectStore`](crate::store::ObjectStore) and
/// [`BucketManager`](crate::buckets::BucketManager).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The configuration violates an invariant.
    #[error("invalid storage configuration: {0}")]
    Config(String),

    /// A bucket could not be checked, created or given its policy.
    #[error("failed to provision bucket {bucket}: {source}")]
    Provisioning {
        /// Bucket being provisioned.
        bucket: String,
        /// Underlying backend failure.
        #[source]
        source: BackendError,
    },

    /// An object write failed.
    #[error("failed to upload {bucket}/{object}: {source}")]
    Upload {
        /// Target bucket.
        bucket: String,
        /// Target object name.
        object: String,
        /// Underlying backend failure.
        #[source]
        source: BackendError,
    },

    /// A URL could not be produced for an object.
    #[error("failed to resolve {bucket}/{object}: {source}")]
    Resolution {
        /// Bucket of the reference.
        bucket: String,
        /// Object of the reference.
        object: String,
        /// Underlying signing failure.
        #[source]
        source: SignError,
    },

    /// The object or its bucket does not exist.
    #[error("object not found: {bucket}/{object}")]
    NotFound {
        /// Bucket name.
        bucket: String,
        /// Object name.
        object: String,
    },

    /// Any other backend failure.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Convenience result alias.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_include_context_in_messages() {
        let err = StoreError::Provisioning {
            bucket: "docs".to_owned(),
            source: BackendError::Request {
                operation: "CreateBucket",
                message: "access denied".to_owned(),
            },
        };
        assert_eq!(
            err.to_string(),
            "failed to provision bucket docs: CreateBucket failed: access denied"
        );
    }

    #[test]
    fn test_should_expose_source_error() {
        use std::error::Error as _;

        let err = StoreError::Resolution {
            bucket: "b".to_owned(),
            object: String::new(),
            source: SignError::EmptyObjectName,
        };
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("object name must not be empty"));
    }

    #[test]
    fn test_should_convert_backend_error_transparently() {
        let err: StoreError = BackendError::NoSuchBucket {
            bucket: "gone".to_owned(),
        }
        .into();
        assert_eq!(err.to_string(), "bucket does not exist: gone");
    }
}
