//! Mock providers for testing.
//!
//! This module is only available when the `test-utils` feature is enabled:
//!
//! ```toml
//! [dev-dependencies]
//! imgup-core = { version = "...", features = ["test-utils"] }
//! ```
//!
//! Every mock is cheaply cloneable and clones share their recorded calls, so
//! a test can keep one handle and pass another into a service.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use url::Url;

use crate::acquire::SourceFetcher;
use crate::host::UploadToken;
use crate::transcode::{Transcoder, WebpQuality};
use crate::upload::{UploadError, UploadProvider, UploadRequest};
use crate::{Error, Result};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// [`SourceFetcher`] serving canned bodies by URL.
#[derive(Debug, Clone, Default)]
pub struct MockFetcher {
    bodies: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MockFetcher {
    /// Serves `body` for `url`; unknown URLs fail with a 404 transfer error.
    pub fn with_body(self, url: &str, body: Vec<u8>) -> Self {
        lock(&self.bodies).insert(url.to_owned(), body);
        self
    }
}

#[async_trait::async_trait]
impl SourceFetcher for MockFetcher {
    async fn fetch(&self, url: &Url) -> Result<Bytes> {
        lock(&self.bodies)
            .get(url.as_str())
            .map(|body| Bytes::from(body.clone()))
            .ok_or_else(|| Error::transfer().with_message(format!("download failed: 404 (url={url})")))
    }
}

/// Canned answer to one upload attempt.
#[derive(Debug, Clone)]
pub enum MockUploadResponse {
    /// 2xx with this body.
    Accepted(String),
    /// Non-2xx with this status and body.
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },
    /// No response at all.
    Transport(String),
}

#[derive(Debug)]
struct MockUploadState {
    token: Result<String, String>,
    domain: Result<String, String>,
    responses: VecDeque<MockUploadResponse>,
    token_requests: Vec<String>,
    attempted_urls: Vec<String>,
    uploaded_bodies: Vec<Vec<u8>>,
}

impl Default for MockUploadState {
    fn default() -> Self {
        Self {
            token: Ok("MOCKAK:signature:policy".to_owned()),
            domain: Ok("upload-z2.qiniup.com".to_owned()),
            responses: VecDeque::new(),
            token_requests: Vec::new(),
            attempted_urls: Vec::new(),
            uploaded_bodies: Vec::new(),
        }
    }
}

/// [`UploadProvider`] with scripted answers that records every call.
///
/// Uploads without a scripted response succeed with a body echoing the key.
#[derive(Debug, Clone, Default)]
pub struct MockUploadProvider {
    state: Arc<Mutex<MockUploadState>>,
}

impl MockUploadProvider {
    /// Sets the token answer; `Err` becomes an authentication error.
    pub fn with_token(self, token: Result<String, String>) -> Self {
        lock(&self.state).token = token;
        self
    }

    /// Sets the directory answer; `Err` becomes a transfer error.
    pub fn with_domain(self, domain: Result<String, String>) -> Self {
        lock(&self.state).domain = domain;
        self
    }

    /// Queues answers for successive upload attempts.
    pub fn with_upload_responses(
        self,
        responses: impl IntoIterator<Item = MockUploadResponse>,
    ) -> Self {
        lock(&self.state).responses.extend(responses);
        self
    }

    /// User tokens presented to the auth service, in order.
    pub fn token_requests(&self) -> Vec<String> {
        lock(&self.state).token_requests.clone()
    }

    /// Upload URLs attempted, in order.
    pub fn attempted_urls(&self) -> Vec<String> {
        lock(&self.state).attempted_urls.clone()
    }

    /// Payload bytes of every upload attempt, in order.
    pub fn uploaded_bodies(&self) -> Vec<Vec<u8>> {
        lock(&self.state).uploaded_bodies.clone()
    }
}

#[async_trait::async_trait]
impl UploadProvider for MockUploadProvider {
    async fn fetch_upload_token(&self, _endpoint: &str, user_token: &str) -> Result<UploadToken> {
        let mut state = lock(&self.state);
        state.token_requests.push(user_token.to_owned());
        match &state.token {
            Ok(token) => Ok(UploadToken::new(token.clone())),
            Err(body) => Err(Error::authentication().with_message(format!("token api error: {body}"))),
        }
    }

    async fn query_upload_domain(&self, _token: &UploadToken, _bucket: &str) -> Result<String> {
        lock(&self.state)
            .domain
            .clone()
            .map_err(|message| Error::transfer().with_message(message))
    }

    async fn upload_once(&self, url: &str, request: &UploadRequest) -> Result<String, UploadError> {
        let mut state = lock(&self.state);
        state.attempted_urls.push(url.to_owned());
        state.uploaded_bodies.push(request.blob.bytes().to_vec());

        let response = state.responses.pop_front().unwrap_or_else(|| {
            MockUploadResponse::Accepted(format!(
                r#"{{"key":"{}","hash":"mock","fsize":{}}}"#,
                request.key,
                request.blob.len()
            ))
        });

        match response {
            MockUploadResponse::Accepted(body) => Ok(body),
            MockUploadResponse::Rejected { status, body } => Err(UploadError::Rejected {
                status,
                body,
                url: url.to_owned(),
            }),
            MockUploadResponse::Transport(message) => {
                Err(UploadError::Transport(Error::transfer().with_message(message)))
            }
        }
    }
}

/// [`Transcoder`] that prefixes the input with a marker instead of encoding.
#[derive(Debug, Clone, Default)]
pub struct MockTranscoder {
    fail: bool,
}

impl MockTranscoder {
    /// A transcoder whose every call fails.
    pub fn failing() -> Self {
        Self { fail: true }
    }

    /// Returns what [`encode`](Transcoder::encode) produces for `input`.
    pub fn expected_output(input: &[u8], quality: WebpQuality) -> Vec<u8> {
        let mut out = format!("RIFF-mock-webp-q{quality}:").into_bytes();
        out.extend_from_slice(input);
        out
    }
}

#[async_trait::async_trait]
impl Transcoder for MockTranscoder {
    async fn encode(&self, bytes: &[u8], quality: WebpQuality) -> Result<Bytes> {
        if self.fail {
            return Err(Error::transcode().with_message("mock encoder exited with 1"));
        }
        Ok(Bytes::from(Self::expected_output(bytes, quality)))
    }
}
