//! Remote source download.

use bytes::Bytes;
use imgup_core::SourceFetcher;
use url::Url;

use crate::client::ReqwestClient;
use crate::error::Error;

/// Tracing target for source downloads.
pub const TRACING_TARGET_FETCH: &str = "imgup_reqwest::fetch";

#[async_trait::async_trait]
impl SourceFetcher for ReqwestClient {
    async fn fetch(&self, url: &Url) -> imgup_core::Result<Bytes> {
        let response = self
            .http()
            .get(url.clone())
            .send()
            .await
            .map_err(|e| with_url(Error::from(e).into(), url))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| with_url(Error::from(e).into(), url))?;

        tracing::debug!(
            target: TRACING_TARGET_FETCH,
            %url,
            status = status.as_u16(),
            size = body.len(),
            "Download completed"
        );

        if !status.is_success() {
            return Err(imgup_core::Error::transfer().with_message(format!(
                "download failed: {} {} (url={url})",
                status.as_u16(),
                String::from_utf8_lossy(&body)
            )));
        }

        Ok(body)
    }
}

/// Prefixes a transport error's message with the URL it concerned.
pub(crate) fn with_url(mut error: imgup_core::Error, url: &impl std::fmt::Display) -> imgup_core::Error {
    let message = error.message.take().unwrap_or_default();
    error.with_message(format!("{message} (url={url})"))
}
