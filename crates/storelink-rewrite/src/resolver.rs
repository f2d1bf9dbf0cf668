//! Classification of string leaves as stored references.

use storelink_core::ObjectReference;
use storelink_core::reference::SCHEME;

use crate::descriptor::ReferenceField;

/// Decide whether `value` names a stored object.
///
/// `storage://bucket/object` is recognised everywhere. The legacy forms are
/// only considered when `field` is `Some`, i.e. the value sits in a field a
/// descriptor marks as reference-bearing:
///
/// - `bucket/object`, split at the first `/`;
/// - a bare object name, when the field declares a default bucket.
///
/// Values that are already URLs are never references.
///
/// # Examples
///
/// ```
/// use storelink_rewrite::descriptor::ReferenceField;
/// use storelink_rewrite::resolver::classify;
///
/// assert!(classify("storage://docs/a.pdf", None).is_some());
/// assert!(classify("docs/a.pdf", None).is_none());
/// assert!(classify("docs/a.pdf", Some(&ReferenceField::new())).is_some());
/// ```
#[must_use]
pub fn classify(value: &str, field: Option<&ReferenceField>) -> Option<ObjectReference> {
    if value.starts_with(SCHEME) {
        return ObjectReference::parse_uri(value);
    }

    let field = field?;
    if is_url(value) {
        return None;
    }
    if let Some(reference) = ObjectReference::parse_path(value) {
        return Some(reference);
    }
    match field.default_bucket() {
        Some(bucket) if !value.is_empty() && !value.contains('/') => {
            Some(ObjectReference::new(bucket, value))
        }
        _ => None,
    }
}

fn is_url(value: &str) -> bool {
    let lower = value.get(..8).unwrap_or(value).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
