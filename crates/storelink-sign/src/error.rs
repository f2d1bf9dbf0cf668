//! Error types for presigned URL construction.
//!
//! Signing is a pure computation, so the only failures are malformed inputs.

/// Errors that can occur while building a presigned URL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignError {
    /// The bucket name is empty.
    #[error("bucket name must not be empty")]
    EmptyBucketName,

    /// The object name is empty.
    #[error("object name must not be empty")]
    EmptyObjectName,

    /// The endpoint did not yield a host.
    #[error("endpoint host must not be empty")]
    EmptyHost,

    /// The expiry is outside the range SigV4 accepts (1 second to 7 days).
    #[error("invalid expiry {0}s: must be between 1 and 604800 seconds")]
    InvalidExpiry(u64),
}
