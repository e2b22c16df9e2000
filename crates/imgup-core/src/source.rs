//! Classification of the raw path-or-URL input.

use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

use crate::{Error, Result};

/// Where the source bytes of an upload come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceReference {
    /// A filesystem path, already converted from any `file://` form.
    LocalPath(PathBuf),
    /// An `http://` or `https://` URL.
    RemoteUrl(Url),
}

impl SourceReference {
    /// Classifies a raw input string.
    ///
    /// Surrounding whitespace and one pair of wrapping `"` or `'` quotes are
    /// removed first. A drive-less Windows path such as `:\Users\me\x.png` is
    /// repaired with the drive letter of `base_dir` when it has one; if it
    /// does not, the path is kept as-is and rejected when read.
    ///
    /// # Errors
    ///
    /// Returns an [`InvalidInput`] error for blank input and an
    /// [`InvalidReference`] error for URLs that cannot be parsed or `file://`
    /// URIs that do not name a local path.
    ///
    /// [`InvalidInput`]: crate::ErrorKind::InvalidInput
    /// [`InvalidReference`]: crate::ErrorKind::InvalidReference
    pub fn parse(input: &str, base_dir: &Path) -> Result<Self> {
        let input = strip_quotes(input.trim());
        if input.is_empty() {
            return Err(Error::invalid_input().with_message("no image path or URL was given"));
        }

        if is_remote(input) {
            let url = Url::parse(input).map_err(|e| {
                Error::invalid_reference()
                    .with_message(format!("invalid url: {input}"))
                    .with_source(e)
            })?;
            return Ok(Self::RemoteUrl(url));
        }

        if has_file_scheme(input) {
            let path = Url::parse(input)
                .ok()
                .and_then(|url| url.to_file_path().ok())
                .ok_or_else(|| {
                    Error::invalid_reference()
                        .with_message(format!("file URI does not name a local path: {input}"))
                })?;
            return Ok(Self::LocalPath(path));
        }

        let repaired = repair_drive_letter(input, &base_dir.to_string_lossy());
        Ok(Self::LocalPath(PathBuf::from(repaired)))
    }

    /// Returns true for remote sources.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteUrl(_))
    }
}

impl fmt::Display for SourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalPath(path) => write!(f, "{}", path.display()),
            Self::RemoteUrl(url) => write!(f, "{url}"),
        }
    }
}

/// Returns true for `http://` and `https://` inputs.
pub fn is_remote(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

fn has_file_scheme(input: &str) -> bool {
    input
        .get(..7)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("file://"))
}

/// Removes one pair of matching `"` or `'` quotes wrapping the whole input.
fn strip_quotes(input: &str) -> &str {
    for quote in ['"', '\''] {
        if input.len() >= 2
            && let Some(inner) = input
                .strip_prefix(quote)
                .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner.trim();
        }
    }
    input
}

/// Returns true for paths that start with `:\` or `:/`, i.e. a Windows path
/// whose drive letter was lost.
pub fn is_driveless(path: &str) -> bool {
    path.starts_with(":\\") || path.starts_with(":/")
}

/// Returns the `X:` drive prefix of a Windows-style path, if any.
fn drive_of(path: &str) -> Option<&str> {
    let bytes = path.as_bytes();
    (bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':').then(|| &path[..2])
}

/// Prepends the drive letter of `base_dir` to a drive-less path.
///
/// Inputs that are not drive-less, or a `base_dir` without a drive letter,
/// leave the input unchanged.
pub fn repair_drive_letter(input: &str, base_dir: &str) -> String {
    if !is_driveless(input) {
        return input.to_owned();
    }
    match drive_of(base_dir) {
        // `input` keeps its leading ':' out of the result: "D:" + "\Users\.."
        Some(drive) => format!("{drive}{}", &input[1..]),
        None => input.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> &'static Path {
        Path::new("/opt/imgup")
    }

    #[test]
    fn test_quoted_input_matches_unquoted() {
        let quoted = SourceReference::parse("\"C:\\img.png\"", base()).unwrap();
        let unquoted = SourceReference::parse("C:\\img.png", base()).unwrap();
        assert_eq!(quoted, unquoted);

        let single = SourceReference::parse("'C:\\img.png'", base()).unwrap();
        assert_eq!(single, unquoted);
    }

    #[test]
    fn test_driveless_path_takes_program_drive() {
        let reference = SourceReference::parse(":\\Users\\me\\x.png", Path::new("D:\\tool")).unwrap();
        assert_eq!(
            reference,
            SourceReference::LocalPath(PathBuf::from("D:\\Users\\me\\x.png"))
        );
    }

    #[test]
    fn test_driveless_path_without_drive_is_kept() {
        assert_eq!(repair_drive_letter(":/Users/me/x.png", "/opt/imgup"), ":/Users/me/x.png");
        assert_eq!(repair_drive_letter(":/Users/me/x.png", "c:/tool"), "c:/Users/me/x.png");
    }

    #[test]
    fn test_remote_url() {
        let reference = SourceReference::parse("https://example.com/a/b.png?x=1", base()).unwrap();
        assert!(reference.is_remote());
    }

    #[test]
    fn test_file_uri() {
        let reference = SourceReference::parse("file:///tmp/cat.png", base()).unwrap();
        assert_eq!(reference, SourceReference::LocalPath(PathBuf::from("/tmp/cat.png")));

        let upper = SourceReference::parse("FILE:///tmp/cat.png", base()).unwrap();
        assert_eq!(upper, reference);
    }

    #[test]
    fn test_file_uri_with_remote_host_is_rejected() {
        let err = SourceReference::parse("file://server/share/cat.png", base()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidReference);
    }

    #[test]
    fn test_blank_input() {
        let err = SourceReference::parse("   ", base()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidInput);

        let err = SourceReference::parse("\"\"", base()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_single_quote_char_is_not_stripped() {
        assert_eq!(strip_quotes("\""), "\"");
    }
}
