//! Qiniu auth, directory and form-upload calls.

use imgup_core::{UploadError, UploadProvider, UploadRequest, UploadToken};
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use url::Url;

use crate::client::ReqwestClient;
use crate::config::UPLOAD_USER_AGENT;
use crate::error::Error;
use crate::fetch::with_url;

/// Tracing target for storage provider calls.
pub const TRACING_TARGET_QINIU: &str = "imgup_reqwest::qiniu";

/// Value of the auth response's `code` field on success.
pub const TOKEN_SUCCESS_CODE: i64 = 1;

/// Extracts the upload token from an auth response body.
///
/// Requires `code == 1`; the token is read from `data.token`, or from a
/// top-level `token` when there is no `data` object.
pub fn token_from_body(body: &Value) -> Option<&str> {
    if body.get("code").and_then(Value::as_i64) != Some(TOKEN_SUCCESS_CODE) {
        return None;
    }
    body.pointer("/data/token")
        .or_else(|| body.get("token"))
        .and_then(Value::as_str)
        .filter(|token| !token.trim().is_empty())
}

/// Extracts the first upload domain from a directory response body.
///
/// Reads `hosts[0].up.domains[0]`, falling back to a top-level `domains[0]`.
pub fn domain_from_body(body: &Value) -> Option<&str> {
    body.pointer("/hosts/0/up/domains/0")
        .or_else(|| body.pointer("/domains/0"))
        .and_then(Value::as_str)
}

impl ReqwestClient {
    fn directory_url(&self, token: &UploadToken, bucket: &str) -> Result<Url, Error> {
        let mut url = Url::parse(&self.provider().directory_endpoint)?;
        url.query_pairs_mut()
            .append_pair("ak", token.access_key())
            .append_pair("bucket", bucket);
        Ok(url)
    }

    fn upload_form(request: &UploadRequest) -> Result<Form, Error> {
        let blob = &request.blob;
        let file = Part::stream_with_length(blob.bytes().clone(), blob.len() as u64)
            .file_name(request.key.to_string())
            .mime_str(blob.mime_type())?;

        Ok(Form::new()
            .text("token", request.token.as_str().to_owned())
            .text("key", request.key.to_string())
            .part("file", file))
    }
}

#[async_trait::async_trait]
impl UploadProvider for ReqwestClient {
    async fn fetch_upload_token(
        &self,
        endpoint: &str,
        user_token: &str,
    ) -> imgup_core::Result<UploadToken> {
        tracing::debug!(target: TRACING_TARGET_QINIU, endpoint, "Requesting upload token");

        let response = self
            .http()
            .get(endpoint)
            .header("token", user_token)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| with_url(Error::from(e).into(), &endpoint))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| with_url(Error::from(e).into(), &endpoint))?;

        if !status.is_success() {
            return Err(imgup_core::Error::authentication().with_message(format!(
                "token request failed: {} {text}",
                status.as_u16()
            )));
        }

        let token = serde_json::from_str::<Value>(&text)
            .ok()
            .as_ref()
            .and_then(token_from_body)
            .map(UploadToken::new);

        token.ok_or_else(|| {
            imgup_core::Error::authentication().with_message(format!("token api error: {text}"))
        })
    }

    async fn query_upload_domain(
        &self,
        token: &UploadToken,
        bucket: &str,
    ) -> imgup_core::Result<String> {
        let url = self.directory_url(token, bucket)?;
        tracing::debug!(target: TRACING_TARGET_QINIU, %url, "Querying upload domain");

        let response = self
            .http()
            .get(url.clone())
            .send()
            .await
            .map_err(|e| with_url(Error::from(e).into(), &url))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| with_url(Error::from(e).into(), &url))?;
        if !status.is_success() {
            return Err(imgup_core::Error::transfer().with_message(format!(
                "directory query failed: {} {text}",
                status.as_u16()
            )));
        }

        let body: Value = serde_json::from_str(&text).map_err(Error::from)?;
        domain_from_body(&body).map(str::to_owned).ok_or_else(|| {
            imgup_core::Error::serialization()
                .with_message(format!("directory response has no domains: {text}"))
        })
    }

    async fn upload_once(&self, url: &str, request: &UploadRequest) -> Result<String, UploadError> {
        let form = Self::upload_form(request).map_err(|e| UploadError::Transport(e.into()))?;

        // reqwest sends `Accept-Encoding: gzip` and decodes gzip replies.
        let response = self
            .upload_http()
            .post(url)
            .header(USER_AGENT, UPLOAD_USER_AGENT)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Transport(with_url(Error::from(e).into(), &url)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| UploadError::Transport(with_url(Error::from(e).into(), &url)))?;

        tracing::debug!(
            target: TRACING_TARGET_QINIU,
            url,
            status = status.as_u16(),
            "Upload response received"
        );

        if !status.is_success() {
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                body,
                url: url.to_owned(),
            });
        }

        Ok(body)
    }
}
