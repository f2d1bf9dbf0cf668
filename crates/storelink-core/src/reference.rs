//! Object references.
//!
//! The canonical textual form is `storage://<bucket>/<object>`. The legacy
//! `<bucket>/<object>` form is only understood where the caller explicitly
//! opts in, since any string with a slash would otherwise match.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Scheme prefix of the canonical reference form.
pub const SCHEME: &str = "storage://";

/// A `(bucket, object)` pair naming a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectReference {
    bucket: String,
    object: String,
}

impl ObjectReference {
    /// Create a reference.
    pub fn new(bucket: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            object: object.into(),
        }
    }

    /// Bucket name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Object name; may contain `/`.
    #[must_use]
    pub fn object(&self) -> &str {
        &self.object
    }

    /// Parse the canonical `storage://<bucket>/<object>` form.
    ///
    /// # Examples
    ///
    /// ```
    /// use storelink_core::reference::ObjectReference;
    ///
    /// let r = ObjectReference::parse_uri("storage://docs/2024/q1.pdf").unwrap();
    /// assert_eq!(r.bucket(), "docs");
    /// assert_eq!(r.object(), "2024/q1.pdf");
    ///
    /// assert!(ObjectReference::parse_uri("docs/q1.pdf").is_none());
    /// ```
    #[must_use]
    pub fn parse_uri(value: &str) -> Option<Self> {
        value.strip_prefix(SCHEME).and_then(Self::parse_path)
    }

    /// Parse the legacy `<bucket>/<object>` form, splitting at the first `/`.
    ///
    /// Both parts must be non-empty.
    #[must_use]
    pub fn parse_path(value: &str) -> Option<Self> {
        let (bucket, object) = value.split_once('/')?;
        if bucket.is_empty() || object.is_empty() {
            return None;
        }
        Some(Self::new(bucket, object))
    }

    /// Render the canonical `storage://` form.
    #[must_use]
    pub fn to_uri(&self) -> String {
        format!("{SCHEME}{}/{}", self.bucket, self.object)
    }
}

/// Formats as the legacy `<bucket>/<object>` path.
impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.object)
    }
}
