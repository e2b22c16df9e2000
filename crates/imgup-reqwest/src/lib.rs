//! Reqwest-based HTTP implementations of the imgup provider traits.
//!
//! [`ReqwestClient`] downloads remote sources ([`SourceFetcher`]) and talks to
//! the storage provider's auth, directory and upload endpoints
//! ([`UploadProvider`]).
//!
//! # Example
//!
//! ```rust,ignore
//! use imgup_core::{FetchService, ProviderConfig, UploadService};
//! use imgup_reqwest::{ReqwestClient, ReqwestConfig};
//!
//! let client = ReqwestClient::new(ReqwestConfig::default(), ProviderConfig::default())?;
//!
//! let fetch: FetchService = client.clone().into_fetch_service();
//! let uploads: UploadService = client.into_upload_service();
//!
//! let token = uploads.get_upload_token(endpoint, user_token).await?;
//! let host = uploads.resolve_upload_host(&token, "chat68").await;
//! ```
//!
//! [`SourceFetcher`]: imgup_core::SourceFetcher
//! [`UploadProvider`]: imgup_core::UploadProvider

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod client;
mod config;
mod error;
mod fetch;
mod qiniu;

pub use crate::client::{ReqwestClient, TRACING_TARGET};
pub use crate::config::{ReqwestConfig, UPLOAD_USER_AGENT};
pub use crate::error::{Error, Result};
pub use crate::fetch::TRACING_TARGET_FETCH;
pub use crate::qiniu::{TRACING_TARGET_QINIU, domain_from_body, token_from_body};
