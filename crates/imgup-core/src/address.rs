//! Content-addressed object keys.

use std::fmt;

/// Storage key of an upload: `hex(md5(bytes)) + "." + extension`.
///
/// Identical bytes and extension always yield the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UploadKey(String);

impl UploadKey {
    /// Derives the key for the given bytes and extension.
    pub fn derive(bytes: &[u8], extension: &str) -> Self {
        let digest = md5::compute(bytes);
        Self(format!("{digest:x}.{extension}"))
    }

    /// Returns the key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UploadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
