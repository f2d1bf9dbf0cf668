//! Storage access configuration.
//!
//! Provides [`StorageConfig`], the typed configuration the host application
//! hands over at startup. It can be deserialized (camelCase JSON), built with
//! the typed builder, or loaded from environment variables.

use std::fmt;

use serde::{Deserialize, Serialize};
use storelink_sign::{Credentials, Endpoint, MAX_EXPIRES_SECS};
use typed_builder::TypedBuilder;

use crate::error::StoreError;

/// Seconds per hour, for the expiry conversion.
const SECS_PER_HOUR: u64 = 3600;

/// Visibility of a bucket, decided by which set of the partition it is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Anonymous reads denied; objects are served through presigned URLs.
    Private,
    /// Anonymous reads allowed; objects are served through direct URLs.
    Public,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Private => f.write_str("private"),
            Self::Public => f.write_str("public"),
        }
    }
}

/// The two disjoint sets of managed bucket names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketPartition {
    /// Buckets whose objects require signed URLs.
    #[serde(default)]
    pub private: Vec<String>,
    /// Buckets whose objects are readable anonymously.
    #[serde(default)]
    pub public: Vec<String>,
}

impl BucketPartition {
    /// Build a partition from two lists of names.
    pub fn new<P, Q>(private: P, public: Q) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        Q: IntoIterator,
        Q::Item: Into<String>,
    {
        Self {
            private: private.into_iter().map(Into::into).collect(),
            public: public.into_iter().map(Into::into).collect(),
        }
    }

    /// Visibility of `bucket`, or `None` when it is not managed.
    #[must_use]
    pub fn visibility(&self, bucket: &str) -> Option<Visibility> {
        if self.private.iter().any(|b| b == bucket) {
            Some(Visibility::Private)
        } else if self.public.iter().any(|b| b == bucket) {
            Some(Visibility::Public)
        } else {
            None
        }
    }

    /// Whether `bucket` is in the private set.
    #[must_use]
    pub fn is_private(&self, bucket: &str) -> bool {
        self.private.iter().any(|b| b == bucket)
    }

    /// All managed buckets with their visibility, private ones first.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Visibility)> {
        self.private
            .iter()
            .map(|b| (b.as_str(), Visibility::Private))
            .chain(self.public.iter().map(|b| (b.as_str(), Visibility::Public)))
    }

    /// Total number of managed buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.private.len() + self.public.len()
    }

    /// Whether no bucket is managed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.private.is_empty() && self.public.is_empty()
    }

    fn first_overlap(&self) -> Option<&str> {
        self.private
            .iter()
            .find(|b| self.public.contains(b))
            .map(String::as_str)
    }
}

/// Configuration of the storage access layer.
///
/// `endpoint`/`port`/`use_ssl` describe how this process reaches the object
/// store. `external_endpoint`/`external_use_ssl` describe how clients of the
/// generated URLs reach it, when that differs.
///
/// # Examples
///
/// ```
/// use storelink_core::config::{BucketPartition, StorageConfig};
///
/// let config = StorageConfig::builder()
///     .endpoint("minio")
///     .port(9000)
///     .access_key("minioadmin")
///     .secret_key("minioadmin")
///     .buckets(BucketPartition::new(["private-docs"], ["public-assets"]))
///     .build();
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.url_expiry_secs(), 3600);
/// ```
#[derive(Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    /// Internal endpoint host, optionally with an embedded port.
    #[builder(setter(into))]
    pub endpoint: String,

    /// Port used when `endpoint` does not embed one.
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub port: Option<u16>,

    /// Whether the internal endpoint speaks TLS.
    #[builder(default = false)]
    #[serde(default, rename = "useSSL", alias = "useSsl")]
    pub use_ssl: bool,

    /// Access key ID.
    #[builder(setter(into))]
    pub access_key: String,

    /// Secret access key.
    #[builder(setter(into))]
    pub secret_key: String,

    /// Region used for bucket creation and the signing scope.
    #[builder(default = String::from("us-east-1"), setter(into))]
    #[serde(default = "default_region")]
    pub region: String,

    /// Externally reachable endpoint used in generated URLs.
    #[builder(default, setter(strip_option, into))]
    #[serde(default)]
    pub external_endpoint: Option<String>,

    /// TLS flag for generated URLs, overriding `use_ssl`.
    #[builder(default, setter(strip_option))]
    #[serde(default, rename = "externalUseSSL", alias = "externalUseSsl")]
    pub external_use_ssl: Option<bool>,

    /// Validity of presigned URLs, in hours.
    #[builder(default = 1)]
    #[serde(default = "default_url_expiry_hours")]
    pub url_expiry_hours: u64,

    /// Managed buckets.
    #[builder(default)]
    #[serde(default)]
    pub buckets: BucketPartition,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"), setter(into))]
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_region() -> String {
    String::from("us-east-1")
}

fn default_url_expiry_hours() -> u64 {
    1
}

fn default_log_level() -> String {
    String::from("info")
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("port", &self.port)
            .field("use_ssl", &self.use_ssl)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("region", &self.region)
            .field("external_endpoint", &self.external_endpoint)
            .field("external_use_ssl", &self.external_use_ssl)
            .field("url_expiry_hours", &self.url_expiry_hours)
            .field("buckets", &self.buckets)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl StorageConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `STORAGE_ENDPOINT` | `localhost` |
    /// | `STORAGE_PORT` | *(unset)* |
    /// | `STORAGE_USE_SSL` | `false` |
    /// | `STORAGE_ACCESS_KEY` | *(empty)* |
    /// | `STORAGE_SECRET_KEY` | *(empty)* |
    /// | `STORAGE_REGION` | `us-east-1` |
    /// | `STORAGE_EXTERNAL_ENDPOINT` | *(unset)* |
    /// | `STORAGE_EXTERNAL_USE_SSL` | *(unset)* |
    /// | `STORAGE_URL_EXPIRY_HOURS` | `1` |
    /// | `STORAGE_PRIVATE_BUCKETS` | *(empty, comma-separated)* |
    /// | `STORAGE_PUBLIC_BUCKETS` | *(empty, comma-separated)* |
    /// | `STORAGE_LOG_LEVEL` | `info` |
    ///
    /// Unparseable numeric values fall back to the default. Call
    /// [`StorageConfig::validate`] before use.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from the `STORAGE_*` variables returned by
    /// `lookup`, with the same defaults as [`StorageConfig::from_env`].
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::builder()
            .endpoint("localhost")
            .access_key(String::new())
            .secret_key(String::new())
            .build();

        if let Some(v) = lookup("STORAGE_ENDPOINT") {
            config.endpoint = v;
        }
        if let Some(v) = lookup("STORAGE_PORT") {
            config.port = v.parse().ok();
        }
        if let Some(v) = lookup("STORAGE_USE_SSL") {
            config.use_ssl = parse_bool(&v);
        }
        if let Some(v) = lookup("STORAGE_ACCESS_KEY") {
            config.access_key = v;
        }
        if let Some(v) = lookup("STORAGE_SECRET_KEY") {
            config.secret_key = v;
        }
        if let Some(v) = lookup("STORAGE_REGION") {
            config.region = v;
        }
        if let Some(v) = lookup("STORAGE_EXTERNAL_ENDPOINT") {
            config.external_endpoint = Some(v).filter(|s| !s.is_empty());
        }
        if let Some(v) = lookup("STORAGE_EXTERNAL_USE_SSL") {
            config.external_use_ssl = Some(parse_bool(&v));
        }
        if let Some(v) = lookup("STORAGE_URL_EXPIRY_HOURS") {
            if let Ok(n) = v.parse::<u64>() {
                config.url_expiry_hours = n;
            }
        }
        if let Some(v) = lookup("STORAGE_PRIVATE_BUCKETS") {
            config.buckets.private = parse_list(&v);
        }
        if let Some(v) = lookup("STORAGE_PUBLIC_BUCKETS") {
            config.buckets.public = parse_list(&v);
        }
        if let Some(v) = lookup("STORAGE_LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }

    /// Check the invariants the rest of the crate relies on.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] when the endpoint or credentials are
    /// empty, the expiry is zero or longer than seven days, or a bucket is
    /// listed as both private and public.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.endpoint.trim().is_empty() {
            return Err(StoreError::Config("endpoint must not be empty".to_owned()));
        }
        if self.access_key.is_empty() || self.secret_key.is_empty() {
            return Err(StoreError::Config(
                "access key and secret key must be set".to_owned(),
            ));
        }
        let max_hours = MAX_EXPIRES_SECS / SECS_PER_HOUR;
        if !(1..=max_hours).contains(&self.url_expiry_hours) {
            return Err(StoreError::Config(format!(
                "url expiry must be between 1 and {max_hours} hours, got {}",
                self.url_expiry_hours
            )));
        }
        if let Some(bucket) = self.buckets.first_overlap() {
            return Err(StoreError::Config(format!(
                "bucket {bucket} is listed as both private and public"
            )));
        }
        Ok(())
    }

    /// Presigned URL validity in seconds.
    #[must_use]
    pub fn url_expiry_secs(&self) -> u64 {
        self.url_expiry_hours.saturating_mul(SECS_PER_HOUR)
    }

    /// The endpoint this process talks to.
    #[must_use]
    pub fn internal_endpoint(&self) -> Endpoint {
        Endpoint::parse(&self.endpoint, self.use_ssl).with_default_port(self.port)
    }

    /// The endpoint generated URLs point at.
    ///
    /// The external endpoint wins over the internal one, and the external TLS
    /// flag wins over the internal one; each falls back independently.
    #[must_use]
    pub fn public_endpoint(&self) -> Endpoint {
        let host = self
            .external_endpoint
            .as_deref()
            .filter(|e| !e.is_empty())
            .unwrap_or(&self.endpoint);
        let secure = self.external_use_ssl.unwrap_or(self.use_ssl);
        Endpoint::parse(host, secure).with_default_port(self.port)
    }

    /// Signing credentials.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.access_key.clone(), self.secret_key.clone())
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// Parse a comma-separated list, dropping blanks.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
