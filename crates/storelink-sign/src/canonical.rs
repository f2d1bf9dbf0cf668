//! Canonical request construction for presigned GET URLs.
//!
//! A presigned GET signs the following newline-separated string:
//!
//! ```text
//! GET\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! host:<authority>\n
//! \n
//! host\n
//! UNSIGNED-PAYLOAD
//! ```
//!
//! The only header that takes part in the signature is `host`, and the payload
//! is never hashed.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Payload hash placeholder used by every presigned URL.
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// The single signed header.
pub const SIGNED_HEADERS: &str = "host";

/// Characters left alone by SigV4 encoding: the RFC 3986 unreserved set
/// (A-Z, a-z, 0-9, `-`, `_`, `.`, `~`). Everything else, `/` included, is
/// percent-encoded with upper-case hex.
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode a single URI component using the SigV4 rules.
///
/// # Examples
///
/// ```
/// use storelink_sign::canonical::uri_encode;
///
/// assert_eq!(uri_encode("hello world"), "hello%20world");
/// assert_eq!(uri_encode("a/b"), "a%2Fb");
/// assert_eq!(uri_encode("q1~v2.pdf"), "q1~v2.pdf");
/// ```
#[must_use]
pub fn uri_encode(input: &str) -> String {
    utf8_percent_encode(input, URI_ENCODE_SET).to_string()
}

/// Build the path-style canonical URI for an object.
///
/// The bucket is encoded as one segment. The object name is split on `/` and
/// each piece is encoded on its own, so slashes inside the object name stay
/// path separators.
///
/// # Examples
///
/// ```
/// use storelink_sign::canonical::build_canonical_uri;
///
/// assert_eq!(
///     build_canonical_uri("secure-docs", "reports/q1 final.pdf"),
///     "/secure-docs/reports/q1%20final.pdf"
/// );
/// ```
#[must_use]
pub fn build_canonical_uri(bucket: &str, object: &str) -> String {
    let object_path = object
        .split('/')
        .map(uri_encode)
        .collect::<Vec<_>>()
        .join("/");
    format!("/{}/{object_path}", uri_encode(bucket))
}

/// Build a canonical query string from already-encoded `(key, value)` pairs.
///
/// Pairs are sorted by key, then by value, and joined as `k=v&k=v`.
///
/// # Examples
///
/// ```
/// use storelink_sign::canonical::build_canonical_query_string;
///
/// let query = build_canonical_query_string(vec![
///     ("X-Amz-Expires", "60".to_owned()),
///     ("X-Amz-Algorithm", "AWS4-HMAC-SHA256".to_owned()),
/// ]);
/// assert_eq!(query, "X-Amz-Algorithm=AWS4-HMAC-SHA256&X-Amz-Expires=60");
/// ```
#[must_use]
pub fn build_canonical_query_string(mut params: Vec<(&str, String)>) -> String {
    params.sort_unstable();
    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the canonical headers block for the `host` header.
///
/// The result ends with the newline that terminates the header list.
#[must_use]
pub fn build_canonical_headers(authority: &str) -> String {
    format!("host:{}\n", authority.to_ascii_lowercase())
}

/// Assemble the canonical request for a presigned GET.
#[must_use]
pub fn build_canonical_request(
    canonical_uri: &str,
    canonical_query: &str,
    authority: &str,
) -> String {
    let canonical_headers = build_canonical_headers(authority);
    [
        "GET",
        canonical_uri,
        canonical_query,
        &canonical_headers,
        SIGNED_HEADERS,
        UNSIGNED_PAYLOAD,
    ]
    .join("\n")
}
