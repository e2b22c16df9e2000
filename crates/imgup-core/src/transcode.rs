//! Optional conversion of source bytes to WebP through an external encoder.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tempfile::NamedTempFile;
use tokio::process::Command;

use crate::{ContentBlob, Error, Result};

/// Tracing target for transcoding.
pub const TRACING_TARGET_TRANSCODE: &str = "imgup_core::transcode";

/// Canonical MIME type of transcoded output.
pub const WEBP_MIME_TYPE: &str = "image/webp";

/// Canonical extension of transcoded output.
pub const WEBP_EXTENSION: &str = "webp";

/// Encoder binary invoked when none is configured.
pub const DEFAULT_ENCODER: &str = "cwebp";

/// Encoder quality in `1..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WebpQuality(u8);

impl WebpQuality {
    /// Quality used when the configured value is out of range.
    pub const DEFAULT: Self = Self(95);

    /// Accepts `1..=100`; any other value silently becomes the default.
    pub fn new(value: i64) -> Self {
        match u8::try_from(value) {
            Ok(q @ 1..=100) => Self(q),
            _ => Self::DEFAULT,
        }
    }

    /// Returns the quality value.
    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for WebpQuality {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for WebpQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Capability to encode image bytes into the target format.
#[async_trait::async_trait]
pub trait Transcoder: Send + Sync {
    /// Encodes `bytes` at the given quality.
    ///
    /// Fails with a [`Transcode`] error that includes the encoder's output.
    ///
    /// [`Transcode`]: crate::ErrorKind::Transcode
    async fn encode(&self, bytes: &[u8], quality: WebpQuality) -> Result<Bytes>;
}

/// Replaces a blob's bytes with their encoded form.
#[derive(Clone)]
pub struct TranscodeService {
    inner: Arc<dyn Transcoder>,
}

impl fmt::Debug for TranscodeService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranscodeService").finish_non_exhaustive()
    }
}

impl TranscodeService {
    /// Create a new transcode service wrapper.
    pub fn new<T>(transcoder: T) -> Self
    where
        T: Transcoder + 'static,
    {
        Self {
            inner: Arc::new(transcoder),
        }
    }

    /// Encodes the blob, overriding its MIME type and extension with the
    /// target format's canonical values regardless of classification.
    pub async fn transcode(&self, blob: &ContentBlob, quality: WebpQuality) -> Result<ContentBlob> {
        let started_at = Instant::now();
        let encoded = self.inner.encode(blob.bytes(), quality).await?;

        tracing::debug!(
            target: TRACING_TARGET_TRANSCODE,
            quality = quality.get(),
            input_size = blob.len(),
            output_size = encoded.len(),
            elapsed_ms = started_at.elapsed().as_millis(),
            "Transcoded source"
        );

        Ok(ContentBlob::new(encoded, WEBP_MIME_TYPE, WEBP_EXTENSION))
    }
}

/// [`Transcoder`] that hands bytes to the `cwebp` command-line encoder via
/// temporary files.
///
/// Runs `<encoder> -q <quality> <input> -o <output>`. Both temporary files are
/// owned by [`NamedTempFile`] guards and removed when the call returns, on
/// success and on every failure path.
#[derive(Debug, Clone)]
pub struct CwebpTranscoder {
    program: PathBuf,
}

impl CwebpTranscoder {
    /// Creates a transcoder that runs the given encoder binary.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Returns the encoder binary.
    pub fn program(&self) -> &PathBuf {
        &self.program
    }
}

impl Default for CwebpTranscoder {
    fn default() -> Self {
        Self::new(DEFAULT_ENCODER)
    }
}

fn temp_file(suffix: &str) -> Result<NamedTempFile> {
    tempfile::Builder::new()
        .prefix("imgup-")
        .suffix(suffix)
        .tempfile()
        .map_err(|e| {
            Error::transcode()
                .with_message("failed to create temporary file")
                .with_source(e)
        })
}

#[async_trait::async_trait]
impl Transcoder for CwebpTranscoder {
    async fn encode(&self, bytes: &[u8], quality: WebpQuality) -> Result<Bytes> {
        let input = temp_file(".input")?;
        let output = temp_file(".webp")?;

        tokio::fs::write(input.path(), bytes).await.map_err(|e| {
            Error::transcode()
                .with_message("failed to write encoder input")
                .with_source(e)
        })?;

        tracing::debug!(
            target: TRACING_TARGET_TRANSCODE,
            program = %self.program.display(),
            quality = quality.get(),
            input = %input.path().display(),
            output = %output.path().display(),
            "Running encoder"
        );

        let result = Command::new(&self.program)
            .arg("-q")
            .arg(quality.to_string())
            .arg(input.path())
            .arg("-o")
            .arg(output.path())
            .output()
            .await
            .map_err(|e| {
                Error::transcode()
                    .with_message(format!(
                        "failed to run {} (install libwebp/cwebp or set enable_webp to false)",
                        self.program.display()
                    ))
                    .with_source(e)
            })?;

        if !result.status.success() {
            let mut log = String::from_utf8_lossy(&result.stdout).into_owned();
            log.push_str(&String::from_utf8_lossy(&result.stderr));
            return Err(Error::transcode().with_message(format!(
                "{} exited with {}: {}",
                self.program.display(),
                result.status,
                log.trim()
            )));
        }

        let encoded = tokio::fs::read(output.path()).await.map_err(|e| {
            Error::transcode()
                .with_message("failed to read encoder output")
                .with_source(e)
        })?;

        Ok(Bytes::from(encoded))
    }
}
