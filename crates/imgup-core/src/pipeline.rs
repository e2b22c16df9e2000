//! End-to-end upload of one image.
//!
//! Stages run strictly in order, each completing before the next starts:
//! acquire, classify, transcode (optional), address, token, host, upload.

use std::fmt;
use std::time::Instant;

use serde_json::Value;

use crate::acquire::FetchService;
use crate::classify::classify;
use crate::transcode::{TranscodeService, WebpQuality};
use crate::upload::{UploadAttempt, UploadRequest, UploadService};
use crate::{ContentBlob, Result, SourceReference, UploadHost, UploadKey};

/// Tracing target for pipeline stages.
pub const TRACING_TARGET_PIPELINE: &str = "imgup_core::pipeline";

/// Per-run settings taken from the user's configuration.
#[derive(Clone)]
pub struct UploadSettings {
    /// Credential presented to the auth service.
    pub user_token: String,
    /// Auth service endpoint.
    pub token_endpoint: String,
    /// Target bucket.
    pub bucket: String,
    /// Encoder quality, used only when transcoding.
    pub quality: WebpQuality,
}

impl fmt::Debug for UploadSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadSettings")
            .field("user_token", &"<redacted>")
            .field("token_endpoint", &self.token_endpoint)
            .field("bucket", &self.bucket)
            .field("quality", &self.quality)
            .finish()
    }
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    /// Key the object was stored under.
    pub key: UploadKey,
    /// Host that accepted the upload.
    pub host: UploadHost,
    /// Whether the fallback host was needed.
    pub attempt: UploadAttempt,
    /// MIME type declared for the upload.
    pub mime_type: String,
    /// Number of bytes uploaded.
    pub size: usize,
    /// Raw response body.
    pub response: String,
}

impl UploadReceipt {
    /// Returns the `key` the service reported, if the body carries one.
    pub fn remote_key(&self) -> Option<String> {
        self.response_field("key")
            .and_then(|v| v.as_str().map(str::to_owned))
    }

    /// Returns the `hash` the service reported, if the body carries one.
    pub fn remote_hash(&self) -> Option<String> {
        self.response_field("hash")
            .and_then(|v| v.as_str().map(str::to_owned))
    }

    /// Returns the `fsize` the service reported, if the body carries one.
    pub fn remote_size(&self) -> Option<u64> {
        self.response_field("fsize").and_then(|v| v.as_u64())
    }

    fn response_field(&self, name: &str) -> Option<Value> {
        serde_json::from_str::<Value>(&self.response)
            .ok()?
            .get(name)
            .cloned()
    }
}

/// Runs the whole upload for one source.
#[derive(Debug, Clone)]
pub struct UploadPipeline {
    fetch: FetchService,
    uploads: UploadService,
    transcoder: Option<TranscodeService>,
}

impl UploadPipeline {
    /// Creates a pipeline; transcoding is enabled by passing a transcoder.
    pub fn new(
        fetch: FetchService,
        uploads: UploadService,
        transcoder: Option<TranscodeService>,
    ) -> Self {
        Self {
            fetch,
            uploads,
            transcoder,
        }
    }

    /// Acquires, classifies and optionally transcodes the source.
    ///
    /// The returned blob is final: its bytes are exactly what is uploaded.
    pub async fn prepare(
        &self,
        reference: &SourceReference,
        quality: WebpQuality,
    ) -> Result<ContentBlob> {
        let bytes = self.fetch.acquire(reference).await?;
        let class = classify(reference, &bytes);

        tracing::debug!(
            target: TRACING_TARGET_PIPELINE,
            mime_type = %class.mime_type,
            extension = %class.extension,
            "Source classified"
        );

        let blob = ContentBlob::new(bytes, class.mime_type, class.extension);
        match &self.transcoder {
            Some(transcoder) => transcoder.transcode(&blob, quality).await,
            None => Ok(blob),
        }
    }

    /// Uploads one source and returns the service's response.
    pub async fn run(
        &self,
        reference: &SourceReference,
        settings: &UploadSettings,
    ) -> Result<UploadReceipt> {
        let started_at = Instant::now();
        tracing::info!(
            target: TRACING_TARGET_PIPELINE,
            source = %reference,
            bucket = %settings.bucket,
            transcode = self.transcoder.is_some(),
            "Starting upload"
        );

        let blob = self.prepare(reference, settings.quality).await?;
        if blob.is_empty() {
            tracing::warn!(target: TRACING_TARGET_PIPELINE, "Source is empty");
        }

        // Derived from the final bytes, after any transcoding.
        let key = blob.upload_key();

        let token = self
            .uploads
            .get_upload_token(&settings.token_endpoint, &settings.user_token)
            .await?;
        let host = self
            .uploads
            .resolve_upload_host(&token, &settings.bucket)
            .await;

        let request = UploadRequest {
            token,
            key: key.clone(),
            blob,
        };
        let outcome = self.uploads.upload(&host, &request).await?;

        let receipt = UploadReceipt {
            key,
            host: outcome.host,
            attempt: outcome.attempt,
            mime_type: request.blob.mime_type().to_owned(),
            size: request.blob.len(),
            response: outcome.body,
        };

        tracing::info!(
            target: TRACING_TARGET_PIPELINE,
            key = %receipt.key,
            host = %receipt.host,
            attempt = %receipt.attempt,
            remote_key = ?receipt.remote_key(),
            remote_hash = ?receipt.remote_hash(),
            remote_size = ?receipt.remote_size(),
            elapsed_ms = started_at.elapsed().as_millis(),
            "Upload finished"
        );

        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::ErrorKind;
    use crate::mock::{MockFetcher, MockTranscoder, MockUploadProvider, MockUploadResponse};
    use crate::provider::ProviderConfig;

    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

    fn settings() -> UploadSettings {
        UploadSettings {
            user_token: "abc".into(),
            token_endpoint: "https://auth.example.com/token".into(),
            bucket: "chat68".into(),
            quality: WebpQuality::DEFAULT,
        }
    }

    fn pipeline(mock: MockUploadProvider, transcoder: Option<MockTranscoder>) -> UploadPipeline {
        UploadPipeline::new(
            FetchService::new(MockFetcher::default()),
            UploadService::new(mock, ProviderConfig::default()),
            transcoder.map(TranscodeService::new),
        )
    }

    fn local_png() -> (tempfile::TempDir, SourceReference) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        std::fs::write(&path, PNG).unwrap();
        let reference = SourceReference::parse(&path.to_string_lossy(), Path::new("/")).unwrap();
        (dir, reference)
    }

    #[tokio::test]
    async fn test_local_png_end_to_end() {
        let (_dir, reference) = local_png();
        let mock = MockUploadProvider::default().with_domain(Err("unreachable".into()));

        let receipt = pipeline(mock.clone(), None)
            .run(&reference, &settings())
            .await
            .unwrap();

        let expected = format!("{:x}.png", md5::compute(PNG));
        assert_eq!(receipt.key.as_str(), expected);
        assert_eq!(receipt.remote_key(), Some(expected));
        assert_eq!(receipt.host.as_str(), "upload-z2.qiniup.com");
        assert_eq!(receipt.mime_type, "image/png");
        assert_eq!(receipt.size, PNG.len());
        assert_eq!(mock.attempted_urls(), vec!["https://upload-z2.qiniup.com"]);
        assert_eq!(mock.token_requests(), vec!["abc".to_owned()]);
    }

    #[tokio::test]
    async fn test_key_is_derived_after_transcoding() {
        let (_dir, reference) = local_png();
        let mock = MockUploadProvider::default();

        let receipt = pipeline(mock.clone(), Some(MockTranscoder::default()))
            .run(&reference, &settings())
            .await
            .unwrap();

        let encoded = MockTranscoder::expected_output(PNG, WebpQuality::DEFAULT);
        assert_eq!(
            receipt.key.as_str(),
            format!("{:x}.webp", md5::compute(&encoded))
        );
        assert_eq!(receipt.mime_type, "image/webp");
        assert_eq!(mock.uploaded_bodies(), vec![encoded]);
    }

    #[tokio::test]
    async fn test_fallback_outcome_is_reported() {
        let (_dir, reference) = local_png();
        let mock = MockUploadProvider::default()
            .with_domain(Ok("up-z0.qiniup.com".into()))
            .with_upload_responses([MockUploadResponse::Rejected {
                status: 400,
                body: r#"{"error":"no such domain"}"#.into(),
            }]);

        let receipt = pipeline(mock.clone(), None)
            .run(&reference, &settings())
            .await
            .unwrap();

        assert_eq!(receipt.attempt, UploadAttempt::Fallback);
        assert_eq!(receipt.host.as_str(), "upload-z2.qiniup.com");
        assert_eq!(mock.attempted_urls().len(), 2);
    }

    #[tokio::test]
    async fn test_token_failure_stops_before_upload() {
        let (_dir, reference) = local_png();
        let mock = MockUploadProvider::default().with_token(Err("code 0".into()));

        let err = pipeline(mock.clone(), None)
            .run(&reference, &settings())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert!(mock.attempted_urls().is_empty());
    }

    #[tokio::test]
    async fn test_transcode_failure_stops_pipeline() {
        let (_dir, reference) = local_png();
        let mock = MockUploadProvider::default();

        let err = pipeline(mock.clone(), Some(MockTranscoder::failing()))
            .run(&reference, &settings())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transcode);
        assert!(mock.token_requests().is_empty());
    }

    #[tokio::test]
    async fn test_missing_source() {
        let reference =
            SourceReference::parse("/definitely/not/here.png", Path::new("/")).unwrap();
        let err = pipeline(MockUploadProvider::default(), None)
            .run(&reference, &settings())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_receipt_fields() {
        let receipt = UploadReceipt {
            key: UploadKey::derive(b"x", "png"),
            host: UploadHost::new_unchecked("up.example.com"),
            attempt: UploadAttempt::Primary,
            mime_type: "image/png".into(),
            size: 1,
            response: r#"{"hash":"Fh8x","fsize":1,"key":"k"}"#.into(),
        };
        assert_eq!(receipt.remote_key().as_deref(), Some("k"));
        assert_eq!(receipt.remote_hash().as_deref(), Some("Fh8x"));
        assert_eq!(receipt.remote_size(), Some(1));

        let opaque = UploadReceipt {
            response: "not json".into(),
            ..receipt
        };
        assert_eq!(opaque.remote_key(), None);
        assert_eq!(opaque.remote_hash(), None);
    }

    #[test]
    fn test_settings_debug_redacts_token() {
        let debug = format!("{:?}", settings());
        assert!(!debug.contains("\"abc\""));
    }
}
