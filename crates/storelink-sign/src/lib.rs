//! AWS Signature Version 4 presigned GET URLs for storelink.
//!
//! This crate builds query-string authenticated URLs for S3-compatible object
//! stores without going through an SDK signer. It is a pure computation: the
//! caller supplies the endpoint, the object location, the expiry and the
//! signing instant, and gets back a URL string.
//!
//! # Usage
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use storelink_sign::{Credentials, Endpoint, UrlSigner};
//!
//! let signer = UrlSigner::new(
//!     Credentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY"),
//!     "us-east-1",
//! );
//! let endpoint = Endpoint::parse("minio.internal:9000", false);
//! let now = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
//!
//! let url = signer
//!     .presign_get(&endpoint, "secure-docs", "reports/q1.pdf", 3600, now)
//!     .unwrap();
//! assert!(url.starts_with("http://minio.internal:9000/secure-docs/reports/q1.pdf?"));
//! ```
//!
//! # Modules
//!
//! - [`canonical`] - Canonical request construction
//! - [`endpoint`] - Host/port/scheme resolution for the target endpoint
//! - [`error`] - Signing error types
//! - [`presign`] - The signer itself

pub mod canonical;
pub mod endpoint;
pub mod error;
pub mod presign;

pub use endpoint::Endpoint;
pub use error::SignError;
pub use presign::{Credentials, MAX_EXPIRES_SECS, UrlSigner};
