//! Source acquisition for local paths and remote URLs.

use std::fmt;
use std::io::ErrorKind as IoErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use url::Url;

use crate::source::is_driveless;
use crate::{Error, Result, SourceReference};

/// Tracing target for source acquisition.
pub const TRACING_TARGET_ACQUIRE: &str = "imgup_core::acquire";

/// Downloads the bytes behind a remote URL.
///
/// Implementations fail with a [`Transfer`] error on a non-2xx status or a
/// timeout, embedding the status and response body.
///
/// [`Transfer`]: crate::ErrorKind::Transfer
#[async_trait::async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Downloads `url` with a `GET` request.
    async fn fetch(&self, url: &Url) -> Result<Bytes>;
}

/// Resolves a [`SourceReference`] into raw bytes.
#[derive(Clone)]
pub struct FetchService {
    inner: Arc<dyn SourceFetcher>,
}

impl fmt::Debug for FetchService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchService").finish_non_exhaustive()
    }
}

impl FetchService {
    /// Create a new fetch service wrapper.
    pub fn new<F>(fetcher: F) -> Self
    where
        F: SourceFetcher + 'static,
    {
        Self {
            inner: Arc::new(fetcher),
        }
    }

    /// Reads the bytes of a local or remote source.
    ///
    /// # Errors
    ///
    /// - [`NotFound`] when a local path does not exist.
    /// - [`InvalidReference`] when a local path is malformed, including a
    ///   Windows path still lacking its drive letter.
    /// - [`Transfer`] when a remote fetch fails.
    ///
    /// [`NotFound`]: crate::ErrorKind::NotFound
    /// [`InvalidReference`]: crate::ErrorKind::InvalidReference
    /// [`Transfer`]: crate::ErrorKind::Transfer
    pub async fn acquire(&self, reference: &SourceReference) -> Result<Bytes> {
        let started_at = Instant::now();
        let bytes = match reference {
            SourceReference::LocalPath(path) => read_local(path).await?,
            SourceReference::RemoteUrl(url) => {
                tracing::debug!(target: TRACING_TARGET_ACQUIRE, %url, "Downloading source");
                self.inner.fetch(url).await?
            }
        };

        tracing::debug!(
            target: TRACING_TARGET_ACQUIRE,
            source = %reference,
            size = bytes.len(),
            elapsed_ms = started_at.elapsed().as_millis(),
            "Source acquired"
        );

        Ok(bytes)
    }
}

/// Reads a local file, mapping failures onto the source error kinds.
pub async fn read_local(path: &Path) -> Result<Bytes> {
    let display = path.display();
    if is_driveless(&path.to_string_lossy()) {
        return Err(Error::invalid_reference().with_message(format!(
            "local path is missing its drive letter: {display} (use a full path such as C:\\Users\\...)"
        )));
    }

    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Bytes::from(bytes)),
        Err(err) if err.kind() == IoErrorKind::NotFound => Err(Error::not_found()
            .with_message(format!(
                "file does not exist: {display} (check that the path includes its drive letter \
                 and that non-ASCII characters survived the terminal; dragging the file into \
                 the terminal or passing it as a quoted argument avoids both)"
            ))
            .with_source(err)),
        Err(err) if err.kind() == IoErrorKind::InvalidInput => Err(Error::invalid_reference()
            .with_message(format!("local path is not valid: {display}"))
            .with_source(err)),
        Err(err) => Err(Error::internal()
            .with_message(format!("failed to read file: {display}"))
            .with_source(err)),
    }
}
