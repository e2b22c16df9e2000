//! Reqwest client configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

/// Default connect timeout: 60 seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 60;

/// Default read timeout for downloads and auth/directory calls: 60 seconds.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 60;

/// Default read timeout for uploads, which may carry large bodies: 120 seconds.
pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 120;

/// User-Agent sent with upload requests.
pub const UPLOAD_USER_AGENT: &str = "QiniuDart";

/// Configuration for the reqwest HTTP client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct ReqwestConfig {
    /// Connect timeout in seconds
    #[cfg_attr(
        feature = "config",
        arg(long = "http-connect-timeout", env = "HTTP_CONNECT_TIMEOUT", default_value = "60")
    )]
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout: u64,

    /// Read timeout in seconds for downloads, token and directory requests
    #[cfg_attr(
        feature = "config",
        arg(long = "http-read-timeout", env = "HTTP_READ_TIMEOUT", default_value = "60")
    )]
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout: u64,

    /// Read timeout in seconds for upload requests
    #[cfg_attr(
        feature = "config",
        arg(long = "http-upload-timeout", env = "HTTP_UPLOAD_TIMEOUT", default_value = "120")
    )]
    #[serde(default = "default_upload_timeout_secs")]
    pub upload_timeout: u64,

    /// User-Agent header to send with download, token and directory requests
    #[cfg_attr(
        feature = "config",
        arg(long = "http-user-agent", env = "HTTP_USER_AGENT")
    )]
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_read_timeout_secs() -> u64 {
    DEFAULT_READ_TIMEOUT_SECS
}

fn default_upload_timeout_secs() -> u64 {
    DEFAULT_UPLOAD_TIMEOUT_SECS
}

impl Default for ReqwestConfig {
    fn default() -> Self {
        Self {
            connect_timeout: default_connect_timeout_secs(),
            read_timeout: default_read_timeout_secs(),
            upload_timeout: default_upload_timeout_secs(),
            user_agent: None,
        }
    }
}

impl ReqwestConfig {
    /// Returns the effective connect timeout, using default if zero.
    pub fn effective_connect_timeout(&self) -> Duration {
        effective(self.connect_timeout, DEFAULT_CONNECT_TIMEOUT_SECS)
    }

    /// Returns the effective read timeout, using default if zero.
    pub fn effective_read_timeout(&self) -> Duration {
        effective(self.read_timeout, DEFAULT_READ_TIMEOUT_SECS)
    }

    /// Returns the effective upload timeout, using default if zero.
    pub fn effective_upload_timeout(&self) -> Duration {
        effective(self.upload_timeout, DEFAULT_UPLOAD_TIMEOUT_SECS)
    }

    /// Returns the effective user agent, using default if not set.
    pub fn effective_user_agent(&self) -> String {
        self.user_agent
            .clone()
            .filter(|ua| !ua.trim().is_empty())
            .unwrap_or_else(Self::default_user_agent)
    }

    /// Returns the default user agent string.
    fn default_user_agent() -> String {
        format!("imgup/{}", env!("CARGO_PKG_VERSION"))
    }

    /// Set the read timeout in seconds.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout_secs: u64) -> Self {
        self.read_timeout = timeout_secs;
        self
    }

    /// Set the upload timeout in seconds.
    #[must_use]
    pub fn with_upload_timeout(mut self, timeout_secs: u64) -> Self {
        self.upload_timeout = timeout_secs;
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

fn effective(secs: u64, default_secs: u64) -> Duration {
    Duration::from_secs(if secs == 0 { default_secs } else { secs })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReqwestConfig::default();
        assert_eq!(config.effective_connect_timeout(), Duration::from_secs(60));
        assert_eq!(config.effective_read_timeout(), Duration::from_secs(60));
        assert_eq!(config.effective_upload_timeout(), Duration::from_secs(120));
        assert!(config.user_agent.is_none());
    }

    #[test]
    fn test_builder_pattern() {
        let config = ReqwestConfig::default()
            .with_read_timeout(5)
            .with_upload_timeout(10)
            .with_user_agent("custom-agent/1.0");

        assert_eq!(config.effective_read_timeout(), Duration::from_secs(5));
        assert_eq!(config.effective_upload_timeout(), Duration::from_secs(10));
        assert_eq!(config.effective_user_agent(), "custom-agent/1.0");
    }

    #[test]
    fn test_zero_timeouts_use_defaults() {
        let config = ReqwestConfig::default()
            .with_read_timeout(0)
            .with_upload_timeout(0);
        assert_eq!(config.effective_read_timeout(), Duration::from_secs(60));
        assert_eq!(config.effective_upload_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_effective_user_agent_uses_default_when_blank() {
        let config = ReqwestConfig::default().with_user_agent("  ");
        assert!(config.effective_user_agent().starts_with("imgup/"));
    }
}
