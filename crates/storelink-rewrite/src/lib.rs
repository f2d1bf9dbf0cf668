//! Rewriting of stored object references into fetchable URLs.
//!
//! Response payloads carry stored references (`storage://bucket/object`)
//! instead of URLs, so that visibility and signing are decided when the
//! payload is read. This crate walks such payloads and swaps each reference
//! for a URL produced by an [`ObjectStore`](storelink_core::ObjectStore):
//! a presigned URL for private buckets, a direct one otherwise.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use storelink_core::{MemoryBackend, ObjectStore, StorageConfig};
//! use storelink_rewrite::{DescriptorRegistry, ResponseRewriter, TypeDescriptor};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = ObjectStore::new(StorageConfig::from_env(), Arc::new(MemoryBackend::new()))?;
//! let registry = DescriptorRegistry::new()
//!     .with(TypeDescriptor::new("User").reference_field("avatar"));
//! let rewriter = ResponseRewriter::new(Arc::new(store), registry);
//!
//! let body = serde_json::json!({"avatar": "storage://private-docs/u1.png"});
//! let body = rewriter.rewrite_json(body).await?;
//! # Ok(())
//! # }
//! ```

pub mod descriptor;
pub mod error;
pub mod resolver;
pub mod rewriter;
pub mod value;

pub use descriptor::{Described, DescriptorRegistry, ReferenceField, TypeDescriptor};
pub use error::RewriteError;
pub use resolver::classify;
pub use rewriter::{DEFAULT_MAX_FAN_OUT, ResolveUrl, ResponseRewriter};
pub use value::{Foreign, Record, Value};
