//! Upload tokens and upload hosts.

use std::fmt;

use url::Url;

/// Opaque bearer string issued by the auth service.
///
/// The only structure relied upon is the access-key prefix before the first
/// `:`, which is what the directory service is queried with.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadToken(String);

impl UploadToken {
    /// Wraps a token string as issued by the auth service.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the access-key prefix of the token.
    pub fn access_key(&self) -> &str {
        self.0.split(':').next().unwrap_or_default()
    }

    /// Returns the full token string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UploadToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadToken")
            .field("access_key", &self.access_key())
            .field("len", &self.0.len())
            .finish_non_exhaustive()
    }
}

/// A bare upload hostname: no scheme, no path, no trailing slash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UploadHost(String);

impl UploadHost {
    /// Normalizes a directory-service domain into a bare host.
    ///
    /// Accepts a bare hostname, a full URL, or a URL with a path. A leading
    /// scheme is stripped by extracting the URL's host, anything from the
    /// first `/` onward is dropped, and surrounding whitespace is trimmed.
    /// Returns `None` when nothing remains.
    pub fn normalize(raw: &str) -> Option<Self> {
        let mut host = raw.trim();
        if host.is_empty() {
            return None;
        }

        let parsed;
        if host.starts_with("http://") || host.starts_with("https://") {
            parsed = Url::parse(host).ok();
            if let Some(url_host) = parsed.as_ref().and_then(Url::host_str)
                && !url_host.is_empty()
            {
                host = url_host;
            }
        }

        if let Some((head, _)) = host.split_once('/') {
            host = head;
        }

        let host = host.trim();
        (!host.is_empty()).then(|| Self(host.to_owned()))
    }

    /// Normalizes `raw`, substituting `fallback` when nothing remains.
    pub fn normalize_or(raw: &str, fallback: UploadHost) -> Self {
        Self::normalize(raw).unwrap_or(fallback)
    }

    /// Wraps a value that is already known to be a bare host.
    pub fn new_unchecked(host: impl Into<String>) -> Self {
        Self(host.into())
    }

    /// Returns the host string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UploadHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
