//! Storage access layer for storelink.
//!
//! Manages a set of private and public buckets on an S3-compatible object
//! store, uploads files into them, and turns stored references into URLs a
//! client can fetch: presigned for private buckets, direct for the rest.
//!
//! # Architecture
//!
//! ```text
//! FileUploader (field validation, concurrent uploads)
//!        |
//!        v
//!   ObjectStore (naming, URL resolution, deletion)
//!        |                 \
//!        v                  v
//!   BucketManager      UrlSigner (storelink-sign)
//!        |
//!        v
//!   ObjectBackend (S3Backend | MemoryBackend)
//! ```

pub mod backend;
pub mod buckets;
pub mod clock;
pub mod config;
pub mod error;
pub mod policy;
pub mod reference;
pub mod store;
pub mod upload;

pub use backend::{MemoryBackend, ObjectBackend, S3Backend};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{BucketPartition, StorageConfig, Visibility};
pub use error::{BackendError, StoreError, StoreResult};
pub use reference::ObjectReference;
pub use store::ObjectStore;
pub use upload::{FileField, FileUploader, StoredField, UploadError, UploadedFile};
