//! Endpoint resolution.
//!
//! An [`Endpoint`] is the `(host, port, scheme)` triple a URL is built against.
//! Configuration hands us a loosely formatted string (`minio:9000`,
//! `https://cdn.example.com`, `storage.local`) plus a TLS flag; this module
//! turns that into something both the signer and the direct-URL builder can
//! render consistently.

use std::fmt;

/// A resolved object-store endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: Option<u16>,
    secure: bool,
}

impl Endpoint {
    /// Parse an endpoint string.
    ///
    /// Any `http://` or `https://` prefix and trailing slashes are stripped.
    /// The remainder is split at the last `:`; if what follows is a valid port
    /// number it becomes the port, otherwise the whole string is the host.
    /// The host is lower-cased.
    ///
    /// # Examples
    ///
    /// ```
    /// use storelink_sign::Endpoint;
    ///
    /// let ep = Endpoint::parse("http://MinIO:9000/", false);
    /// assert_eq!(ep.host(), "minio");
    /// assert_eq!(ep.port(), Some(9000));
    ///
    /// let ep = Endpoint::parse("cdn.example.com", true);
    /// assert_eq!(ep.port(), None);
    /// ```
    #[must_use]
    pub fn parse(raw: &str, secure: bool) -> Self {
        let trimmed = raw.trim();
        let without_scheme = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))
            .unwrap_or(trimmed)
            .trim_end_matches('/');

        let (host, port) = match without_scheme.rsplit_once(':') {
            Some((host, port)) => match port.parse::<u16>() {
                Ok(port) => (host, Some(port)),
                Err(_) => (without_scheme, None),
            },
            None => (without_scheme, None),
        };

        Self {
            host: host.to_ascii_lowercase(),
            port,
            secure,
        }
    }

    /// Use `port` unless the endpoint string already carried one.
    #[must_use]
    pub fn with_default_port(mut self, port: Option<u16>) -> Self {
        if self.port.is_none() {
            self.port = port;
        }
        self
    }

    /// The lower-cased host name.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The explicit port, if any.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Whether URLs are built with `https`.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// `https` or `http`.
    #[must_use]
    pub fn scheme(&self) -> &'static str {
        if self.secure { "https" } else { "http" }
    }

    /// `host[:port]` as sent in the `Host` header.
    ///
    /// A port equal to the scheme default is left out, since that is what an
    /// HTTP client puts in the `Host` header for such a URL.
    #[must_use]
    pub fn authority(&self) -> String {
        match self.port {
            Some(port) if !self.is_default_port(port) => format!("{}:{port}", self.host),
            _ => self.host.clone(),
        }
    }

    /// `scheme://host[:port]` without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme(), self.authority())
    }

    fn is_default_port(&self, port: u16) -> bool {
        (self.secure && port == 443) || (!self.secure && port == 80)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url())
    }
}
