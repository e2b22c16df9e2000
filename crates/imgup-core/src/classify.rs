//! MIME type and extension inference.
//!
//! The two resolutions are independent: the extension is not required to
//! agree with the MIME type.
//!
//! MIME type, first match wins:
//! 1. content-type guess by filename (local sources only)
//! 2. byte signature (PNG, JPEG, GIF)
//! 3. `application/octet-stream`
//!
//! Extension, first match wins:
//! 1. suffix of the local filename
//! 2. suffix of the last URL path segment (query excluded)
//! 3. derived from the resolved MIME type (`png`, `jpg`, `gif`)
//! 4. `bin`

use crate::SourceReference;
use crate::content::{DEFAULT_EXTENSION, OCTET_STREAM};

/// MIME type and extension of a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Resolved MIME type.
    pub mime_type: String,
    /// Resolved extension, without a leading dot.
    pub extension: String,
}

/// Classifies a source from its reference and bytes.
pub fn classify(reference: &SourceReference, bytes: &[u8]) -> Classification {
    let mime_type = guess_mime(reference)
        .or_else(|| sniff_mime(bytes))
        .unwrap_or(OCTET_STREAM)
        .to_owned();

    let extension = name_extension(reference)
        .or_else(|| extension_for_mime(&mime_type))
        .unwrap_or(DEFAULT_EXTENSION)
        .to_owned();

    Classification {
        mime_type,
        extension,
    }
}

/// Guesses a MIME type from the filename of a local source.
fn guess_mime(reference: &SourceReference) -> Option<&'static str> {
    let SourceReference::LocalPath(path) = reference else {
        return None;
    };
    let name = file_name(&path.to_string_lossy()).to_owned();
    mime_guess::from_path(name).first_raw()
}

/// Recognizes PNG, JPEG and GIF by their leading bytes.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF") {
        Some("image/gif")
    } else {
        None
    }
}

fn name_extension(reference: &SourceReference) -> Option<&str> {
    match reference {
        SourceReference::LocalPath(path) => path.to_str().and_then(|p| suffix(file_name(p))),
        SourceReference::RemoteUrl(url) => url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .and_then(suffix),
    }
}

/// Maps a MIME type onto the extension used for its key.
pub fn extension_for_mime(mime_type: &str) -> Option<&'static str> {
    let mime_type = mime_type.to_ascii_lowercase();
    if mime_type.contains("png") {
        Some("png")
    } else if mime_type.contains("jpeg") || mime_type.contains("jpg") {
        Some("jpg")
    } else if mime_type.contains("gif") {
        Some("gif")
    } else {
        None
    }
}

/// Returns the last component of a path, splitting on both `/` and `\` so
/// Windows paths behave the same on every platform.
fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Returns the text after the last `.` of a name, if non-empty.
fn suffix(name: &str) -> Option<&str> {
    name.rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.trim().is_empty())
}
