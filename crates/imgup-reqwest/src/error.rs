//! Internal error types for imgup-reqwest.

use thiserror::Error;

/// Result type alias for imgup-reqwest operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Internal error type for imgup-reqwest operations.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Invalid endpoint URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl From<Error> for imgup_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Reqwest(e) => {
                let message = if e.is_timeout() {
                    format!("request timed out: {e}")
                } else if e.is_connect() {
                    format!("connection failed: {e}")
                } else {
                    e.to_string()
                };
                imgup_core::Error::transfer()
                    .with_message(message)
                    .with_source(e)
            }
            Error::Serde(e) => imgup_core::Error::serialization()
                .with_message(e.to_string())
                .with_source(e),
            Error::Url(e) => imgup_core::Error::configuration()
                .with_message(e.to_string())
                .with_source(e),
        }
    }
}
