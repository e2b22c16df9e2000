//! Token acquisition, upload host resolution and the upload itself.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use strum::{AsRefStr, Display};

use crate::host::{UploadHost, UploadToken};
use crate::provider::ProviderConfig;
use crate::{ContentBlob, Error, Result, UploadKey};

/// Tracing target for upload operations.
pub const TRACING_TARGET_UPLOAD: &str = "imgup_core::upload";

/// Error text with which the storage service rejects an upload host that
/// does not serve the bucket.
pub const NO_SUCH_DOMAIN: &str = "no such domain";

/// Everything an upload attempt sends besides the target host.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Authorization token, sent as the `token` form field.
    pub token: UploadToken,
    /// Object key, sent as the `key` field and as the file name.
    pub key: UploadKey,
    /// Payload, sent as the `file` field.
    pub blob: ContentBlob,
}

/// A failed upload attempt.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The service answered with a non-2xx status.
    #[error("upload failed: {status} {body} (uploadUrl={url})")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
        /// URL the request was sent to.
        url: String,
    },
    /// The request did not produce a response.
    #[error(transparent)]
    Transport(#[from] Error),
}

impl From<UploadError> for Error {
    fn from(error: UploadError) -> Self {
        match error {
            UploadError::Transport(error) => error,
            rejected @ UploadError::Rejected { .. } => {
                Error::transfer().with_message(rejected.to_string())
            }
        }
    }
}

/// How a failed primary attempt is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadErrorClass {
    /// The resolved host does not serve the bucket: retry once on the
    /// fallback host.
    FallbackHost,
    /// Anything else: surface immediately.
    Fatal,
}

/// Classifies a non-2xx upload response.
pub fn classify_upload_error(_status: u16, body: &str) -> UploadErrorClass {
    if body.contains(NO_SUCH_DOMAIN) {
        UploadErrorClass::FallbackHost
    } else {
        UploadErrorClass::Fatal
    }
}

impl UploadError {
    /// Classifies this failure; transport errors are always fatal.
    pub fn class(&self) -> UploadErrorClass {
        match self {
            Self::Rejected { status, body, .. } => classify_upload_error(*status, body),
            Self::Transport(_) => UploadErrorClass::Fatal,
        }
    }
}

/// The two states of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum UploadAttempt {
    /// Upload to the resolved host.
    Primary,
    /// Single retry on the fallback host.
    Fallback,
}

/// A successful upload.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// Attempt that succeeded.
    pub attempt: UploadAttempt,
    /// Host that accepted the upload.
    pub host: UploadHost,
    /// Raw, unparsed response body.
    pub body: String,
}

/// Network operations of the storage provider.
#[async_trait::async_trait]
pub trait UploadProvider: Send + Sync {
    /// Fetches an upload token from the auth service with the user's token.
    ///
    /// Fails with an [`Authentication`] error that embeds the raw response
    /// body unless the status is 2xx and the body reports success.
    ///
    /// [`Authentication`]: crate::ErrorKind::Authentication
    async fn fetch_upload_token(&self, endpoint: &str, user_token: &str) -> Result<UploadToken>;

    /// Asks the directory service for the bucket's upload domain, returned
    /// as-is before normalization.
    async fn query_upload_domain(&self, token: &UploadToken, bucket: &str) -> Result<String>;

    /// Sends one multipart upload to `url`.
    async fn upload_once(&self, url: &str, request: &UploadRequest) -> Result<String, UploadError>;
}

/// Token, host and upload operations with the provider's fallback policy.
#[derive(Clone)]
pub struct UploadService {
    inner: Arc<dyn UploadProvider>,
    provider: ProviderConfig,
}

impl fmt::Debug for UploadService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadService")
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

impl UploadService {
    /// Create a new upload service wrapper.
    pub fn new<P>(provider: P, config: ProviderConfig) -> Self
    where
        P: UploadProvider + 'static,
    {
        Self {
            inner: Arc::new(provider),
            provider: config,
        }
    }

    /// Returns the provider configuration.
    pub fn provider(&self) -> &ProviderConfig {
        &self.provider
    }

    /// Fetches an upload token. Failures are fatal.
    pub async fn get_upload_token(&self, endpoint: &str, user_token: &str) -> Result<UploadToken> {
        let token = self.inner.fetch_upload_token(endpoint, user_token).await?;
        tracing::debug!(
            target: TRACING_TARGET_UPLOAD,
            access_key = token.access_key(),
            "Upload token acquired"
        );
        Ok(token)
    }

    /// Resolves the bucket's upload host.
    ///
    /// Never fails: any directory-service error, and any domain that
    /// normalizes to nothing, yields the fallback host. The service does not
    /// tell "no record" apart from a network error, so neither does this.
    pub async fn resolve_upload_host(&self, token: &UploadToken, bucket: &str) -> UploadHost {
        let fallback = self.provider.fallback_host();
        match self.inner.query_upload_domain(token, bucket).await {
            Ok(domain) => {
                let host = UploadHost::normalize_or(&domain, fallback);
                tracing::debug!(
                    target: TRACING_TARGET_UPLOAD,
                    bucket,
                    domain = %domain,
                    host = %host,
                    "Upload host resolved"
                );
                host
            }
            Err(error) => {
                tracing::debug!(
                    target: TRACING_TARGET_UPLOAD,
                    bucket,
                    error = %error,
                    host = %fallback,
                    "Upload host query failed, using fallback host"
                );
                fallback
            }
        }
    }

    /// Uploads to `host`, retrying exactly once on the fallback host when the
    /// primary attempt is rejected because the host does not serve the
    /// bucket. Any other failure, and any failure of the retry, is final.
    pub async fn upload(&self, host: &UploadHost, request: &UploadRequest) -> Result<UploadOutcome> {
        match self.attempt(UploadAttempt::Primary, host, request).await {
            Ok(outcome) => Ok(outcome),
            Err(error) if error.class() == UploadErrorClass::FallbackHost => {
                let fallback = self.provider.fallback_host();
                tracing::warn!(
                    target: TRACING_TARGET_UPLOAD,
                    host = %host,
                    fallback = %fallback,
                    "Upload host does not serve the bucket, retrying on fallback host"
                );
                self.attempt(UploadAttempt::Fallback, &fallback, request)
                    .await
                    .map_err(Error::from)
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn attempt(
        &self,
        attempt: UploadAttempt,
        host: &UploadHost,
        request: &UploadRequest,
    ) -> Result<UploadOutcome, UploadError> {
        let url = self.provider.upload_url(host);
        let started_at = Instant::now();

        tracing::debug!(
            target: TRACING_TARGET_UPLOAD,
            %attempt,
            %url,
            key = %request.key,
            size = request.blob.len(),
            "Uploading"
        );

        let result = self.inner.upload_once(&url, request).await;
        let elapsed_ms = started_at.elapsed().as_millis();

        match &result {
            Ok(_) => tracing::info!(
                target: TRACING_TARGET_UPLOAD,
                %attempt,
                %url,
                elapsed_ms,
                "Upload succeeded"
            ),
            Err(error) => tracing::warn!(
                target: TRACING_TARGET_UPLOAD,
                %attempt,
                %url,
                elapsed_ms,
                error = %error,
                "Upload attempt failed"
            ),
        }

        result.map(|body| UploadOutcome {
            attempt,
            host: host.clone(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::mock::{MockUploadProvider, MockUploadResponse};

    fn request() -> UploadRequest {
        let blob = ContentBlob::new(b"\x89PNG".to_vec(), "image/png", "png");
        UploadRequest {
            token: UploadToken::new("AK:sig"),
            key: blob.upload_key(),
            blob,
        }
    }

    fn rejected(body: &str) -> MockUploadResponse {
        MockUploadResponse::Rejected {
            status: 400,
            body: body.to_owned(),
        }
    }

    #[test]
    fn test_classify_upload_error() {
        assert_eq!(
            classify_upload_error(400, r#"{"error":"no such domain"}"#),
            UploadErrorClass::FallbackHost
        );
        assert_eq!(
            classify_upload_error(401, r#"{"error":"bad token"}"#),
            UploadErrorClass::Fatal
        );
        assert_eq!(classify_upload_error(500, ""), UploadErrorClass::Fatal);
    }

    #[test]
    fn test_rejected_message_embeds_context() {
        let error = Error::from(UploadError::Rejected {
            status: 403,
            body: "forbidden".into(),
            url: "https://up.example.com".into(),
        });
        assert_eq!(error.kind(), ErrorKind::Transfer);
        let message = error.message.unwrap();
        assert!(message.contains("403"));
        assert!(message.contains("forbidden"));
        assert!(message.contains("https://up.example.com"));
    }

    #[tokio::test]
    async fn test_primary_success_does_not_retry() {
        let mock = MockUploadProvider::default();
        let service = UploadService::new(mock.clone(), ProviderConfig::default());
        let host = UploadHost::new_unchecked("up-z0.qiniup.com");

        let outcome = service.upload(&host, &request()).await.unwrap();
        assert_eq!(outcome.attempt, UploadAttempt::Primary);
        assert_eq!(mock.attempted_urls(), vec!["https://up-z0.qiniup.com"]);
    }

    #[tokio::test]
    async fn test_no_such_domain_retries_once_on_fallback() {
        let mock = MockUploadProvider::default()
            .with_upload_responses([rejected(r#"{"error":"no such domain"}"#)]);
        let service = UploadService::new(mock.clone(), ProviderConfig::default());
        let host = UploadHost::new_unchecked("up-z0.qiniup.com");

        let outcome = service.upload(&host, &request()).await.unwrap();
        assert_eq!(outcome.attempt, UploadAttempt::Fallback);
        assert_eq!(outcome.host.as_str(), "upload-z2.qiniup.com");
        assert_eq!(
            mock.attempted_urls(),
            vec!["https://up-z0.qiniup.com", "https://upload-z2.qiniup.com"]
        );
    }

    #[tokio::test]
    async fn test_fallback_failure_is_final() {
        let mock = MockUploadProvider::default().with_upload_responses([
            rejected("no such domain"),
            rejected("no such domain"),
        ]);
        let service = UploadService::new(mock.clone(), ProviderConfig::default());
        let host = UploadHost::new_unchecked("up-z0.qiniup.com");

        let err = service.upload(&host, &request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transfer);
        assert!(err.message.unwrap().contains("upload-z2.qiniup.com"));
        assert_eq!(mock.attempted_urls().len(), 2);
    }

    #[tokio::test]
    async fn test_other_rejection_is_not_retried() {
        let mock =
            MockUploadProvider::default().with_upload_responses([rejected("file exists")]);
        let service = UploadService::new(mock.clone(), ProviderConfig::default());
        let host = UploadHost::new_unchecked("up-z0.qiniup.com");

        let err = service.upload(&host, &request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transfer);
        assert_eq!(mock.attempted_urls().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_is_not_retried() {
        let mock = MockUploadProvider::default()
            .with_upload_responses([MockUploadResponse::Transport("no such domain".into())]);
        let service = UploadService::new(mock.clone(), ProviderConfig::default());
        let host = UploadHost::new_unchecked("up-z0.qiniup.com");

        assert!(service.upload(&host, &request()).await.is_err());
        assert_eq!(mock.attempted_urls().len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_host_normalizes_domain() {
        let mock = MockUploadProvider::default().with_domain(Ok("https://up-z0.qiniup.com/".into()));
        let service = UploadService::new(mock, ProviderConfig::default());

        let host = service
            .resolve_upload_host(&UploadToken::new("AK:sig"), "chat68")
            .await;
        assert_eq!(host.as_str(), "up-z0.qiniup.com");
    }

    #[tokio::test]
    async fn test_resolve_host_failure_falls_back() {
        let mock = MockUploadProvider::default()
            .with_domain(Err("directory service unavailable".into()));
        let service = UploadService::new(mock, ProviderConfig::default());

        let host = service
            .resolve_upload_host(&UploadToken::new("AK:sig"), "chat68")
            .await;
        assert_eq!(host.as_str(), "upload-z2.qiniup.com");
    }

    #[tokio::test]
    async fn test_resolve_host_blank_domain_falls_back() {
        let mock = MockUploadProvider::default().with_domain(Ok("  ".into()));
        let service = UploadService::new(mock, ProviderConfig::default());

        let host = service
            .resolve_upload_host(&UploadToken::new("AK:sig"), "chat68")
            .await;
        assert_eq!(host.as_str(), "upload-z2.qiniup.com");
    }

    #[tokio::test]
    async fn test_token_failure_is_fatal() {
        let mock = MockUploadProvider::default().with_token(Err("code 0".into()));
        let service = UploadService::new(mock, ProviderConfig::default());

        let err = service
            .get_upload_token("https://auth.example.com", "abc")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }
}
