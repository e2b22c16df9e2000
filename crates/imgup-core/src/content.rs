//! Upload payloads.

use bytes::Bytes;

use crate::address::UploadKey;

/// MIME type used when nothing better is known.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Extension used when nothing better is known.
pub const DEFAULT_EXTENSION: &str = "bin";

/// Raw bytes together with their inferred MIME type and extension.
///
/// Produced by acquisition and classification, possibly replaced by the
/// transcoder, and never modified once the upload key has been derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentBlob {
    bytes: Bytes,
    mime_type: String,
    extension: String,
}

impl ContentBlob {
    /// Creates a new blob.
    pub fn new(bytes: impl Into<Bytes>, mime_type: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
            extension: extension.into(),
        }
    }

    /// Returns the raw bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Returns the declared MIME type.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Returns the file extension, without a leading dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Returns the number of bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the blob holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Derives the content-addressed key of exactly these bytes.
    pub fn upload_key(&self) -> UploadKey {
        UploadKey::derive(&self.bytes, &self.extension)
    }
}
