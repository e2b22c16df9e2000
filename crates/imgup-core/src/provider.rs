//! Storage provider constants.

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::host::UploadHost;

/// Bucket used when the config file names none.
pub const DEFAULT_BUCKET: &str = "chat68";

/// Auth service endpoint used when the config file names none.
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://chat-go.jwzhd.com/v1/misc/qiniu-token";

/// Directory service queried for the bucket's upload host.
pub const DEFAULT_DIRECTORY_ENDPOINT: &str = "https://api.qiniu.com/v4/query";

/// Upload host used when the directory service is unusable or the resolved
/// host rejects the bucket.
pub const DEFAULT_FALLBACK_HOST: &str = "upload-z2.qiniup.com";

/// Scheme of the upload URL.
pub const DEFAULT_UPLOAD_SCHEME: &str = "https";

/// Immutable provider configuration, constructed once at startup and passed
/// explicitly to every stage that needs a provider constant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct ProviderConfig {
    /// Bucket used when the config file does not name one
    #[cfg_attr(
        feature = "config",
        arg(long = "default-bucket", env = "IMGUP_DEFAULT_BUCKET", default_value = DEFAULT_BUCKET)
    )]
    #[serde(default = "default_bucket")]
    pub default_bucket: String,

    /// Auth service endpoint used when the config file does not name one
    #[cfg_attr(
        feature = "config",
        arg(long = "default-token-endpoint", env = "IMGUP_DEFAULT_TOKEN_ENDPOINT", default_value = DEFAULT_TOKEN_ENDPOINT)
    )]
    #[serde(default = "default_token_endpoint")]
    pub default_token_endpoint: String,

    /// Directory service endpoint resolving a bucket's upload host
    #[cfg_attr(
        feature = "config",
        arg(long = "directory-endpoint", env = "IMGUP_DIRECTORY_ENDPOINT", default_value = DEFAULT_DIRECTORY_ENDPOINT)
    )]
    #[serde(default = "default_directory_endpoint")]
    pub directory_endpoint: String,

    /// Upload host used when resolution fails or the bucket is not served
    #[cfg_attr(
        feature = "config",
        arg(long = "fallback-host", env = "IMGUP_FALLBACK_HOST", default_value = DEFAULT_FALLBACK_HOST)
    )]
    #[serde(default = "default_fallback_host")]
    pub fallback_host: String,

    /// Scheme used to build upload URLs
    #[cfg_attr(
        feature = "config",
        arg(long = "upload-scheme", env = "IMGUP_UPLOAD_SCHEME", default_value = DEFAULT_UPLOAD_SCHEME)
    )]
    #[serde(default = "default_upload_scheme")]
    pub upload_scheme: String,
}

fn default_bucket() -> String {
    DEFAULT_BUCKET.to_owned()
}

fn default_token_endpoint() -> String {
    DEFAULT_TOKEN_ENDPOINT.to_owned()
}

fn default_directory_endpoint() -> String {
    DEFAULT_DIRECTORY_ENDPOINT.to_owned()
}

fn default_fallback_host() -> String {
    DEFAULT_FALLBACK_HOST.to_owned()
}

fn default_upload_scheme() -> String {
    DEFAULT_UPLOAD_SCHEME.to_owned()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            default_bucket: default_bucket(),
            default_token_endpoint: default_token_endpoint(),
            directory_endpoint: default_directory_endpoint(),
            fallback_host: default_fallback_host(),
            upload_scheme: default_upload_scheme(),
        }
    }
}

impl ProviderConfig {
    /// Returns the fallback host, normalized.
    ///
    /// A fallback host that normalizes to nothing is replaced by the built-in
    /// default so that there is always somewhere to upload to.
    pub fn fallback_host(&self) -> UploadHost {
        UploadHost::normalize(&self.fallback_host)
            .unwrap_or_else(|| UploadHost::new_unchecked(DEFAULT_FALLBACK_HOST))
    }

    /// Builds the upload URL for the given host.
    pub fn upload_url(&self, host: &UploadHost) -> String {
        format!("{}://{}", self.upload_scheme, host)
    }

    /// Set the fallback host.
    #[must_use]
    pub fn with_fallback_host(mut self, host: impl Into<String>) -> Self {
        self.fallback_host = host.into();
        self
    }

    /// Set the directory service endpoint.
    #[must_use]
    pub fn with_directory_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.directory_endpoint = endpoint.into();
        self
    }

    /// Set the upload scheme.
    #[must_use]
    pub fn with_upload_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.upload_scheme = scheme.into();
        self
    }
}
