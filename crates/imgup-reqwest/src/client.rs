//! Reqwest-based HTTP client shared by the fetch and upload providers.

use std::sync::Arc;
use std::time::Duration;

use imgup_core::{FetchService, ProviderConfig, UploadService};
use reqwest::Client;

use crate::config::ReqwestConfig;
use crate::error::Result;

/// Tracing target for reqwest client operations.
pub const TRACING_TARGET: &str = "imgup_reqwest::client";

/// Inner client that holds the HTTP clients and configuration.
struct ReqwestClientInner {
    http: Client,
    upload_http: Client,
    config: ReqwestConfig,
    provider: ProviderConfig,
}

/// Reqwest-based HTTP client for downloading sources and talking to the
/// storage provider.
///
/// Implements both [`SourceFetcher`] and [`UploadProvider`].
///
/// # Examples
///
/// ```rust,ignore
/// use imgup_core::ProviderConfig;
/// use imgup_reqwest::{ReqwestClient, ReqwestConfig};
///
/// let client = ReqwestClient::new(ReqwestConfig::default(), ProviderConfig::default())?;
/// let fetch = client.clone().into_fetch_service();
/// let uploads = client.into_upload_service();
/// ```
///
/// [`SourceFetcher`]: imgup_core::SourceFetcher
/// [`UploadProvider`]: imgup_core::UploadProvider
#[derive(Clone)]
pub struct ReqwestClient {
    inner: Arc<ReqwestClientInner>,
}

impl std::fmt::Debug for ReqwestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestClient")
            .field("config", &self.inner.config)
            .field("provider", &self.inner.provider)
            .finish_non_exhaustive()
    }
}

impl ReqwestClient {
    /// Creates a new reqwest client with the given configuration.
    ///
    /// Two connection pools are built, differing only in their read timeout:
    /// one for downloads and the token and directory calls, one for uploads.
    /// The read timeout bounds each wait for data, not the whole request, so
    /// a slow but steady upload is never cut off.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be created.
    pub fn new(config: ReqwestConfig, provider: ProviderConfig) -> Result<Self> {
        let connect_timeout = config.effective_connect_timeout();

        tracing::debug!(
            target: TRACING_TARGET,
            connect_timeout_ms = connect_timeout.as_millis(),
            read_timeout_ms = config.effective_read_timeout().as_millis(),
            upload_timeout_ms = config.effective_upload_timeout().as_millis(),
            "Creating reqwest client"
        );

        let http = Self::build_client(&config, config.effective_read_timeout())?;
        let upload_http = Self::build_client(&config, config.effective_upload_timeout())?;

        let inner = ReqwestClientInner {
            http,
            upload_http,
            config,
            provider,
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    fn build_client(config: &ReqwestConfig, read_timeout: Duration) -> Result<Client> {
        let client = Client::builder()
            .connect_timeout(config.effective_connect_timeout())
            .read_timeout(read_timeout)
            .user_agent(config.effective_user_agent())
            .build()?;
        Ok(client)
    }

    /// Gets the HTTP client for downloads, token and directory calls.
    pub(crate) fn http(&self) -> &Client {
        &self.inner.http
    }

    /// Gets the HTTP client for uploads.
    pub(crate) fn upload_http(&self) -> &Client {
        &self.inner.upload_http
    }

    /// Gets the client configuration.
    pub fn config(&self) -> &ReqwestConfig {
        &self.inner.config
    }

    /// Gets the provider configuration.
    pub fn provider(&self) -> &ProviderConfig {
        &self.inner.provider
    }

    /// Converts this client into a [`FetchService`].
    pub fn into_fetch_service(self) -> FetchService {
        FetchService::new(self)
    }

    /// Converts this client into an [`UploadService`] sharing its provider
    /// configuration.
    pub fn into_upload_service(self) -> UploadService {
        let provider = self.inner.provider.clone();
        UploadService::new(self, provider)
    }
}
