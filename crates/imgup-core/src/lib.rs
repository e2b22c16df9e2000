#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # imgup core
//!
//! Types, provider traits and orchestration for uploading one image to an
//! object-storage bucket:
//!
//! ```text
//! SourceReference ─ acquire ─ classify ─ [transcode] ─ UploadKey
//!                                                        │
//!           UploadToken ─ resolve host ─ upload (primary, then fallback once)
//! ```
//!
//! Network access and the external encoder sit behind the [`SourceFetcher`],
//! [`UploadProvider`] and [`Transcoder`] traits; `imgup-reqwest` provides the
//! HTTP implementations.

mod address;
mod content;
mod error;
mod host;
mod source;

pub mod acquire;
pub mod classify;
pub mod pipeline;
pub mod present;
pub mod provider;
pub mod transcode;
pub mod upload;

#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod mock;

pub use acquire::{FetchService, SourceFetcher};
pub use address::UploadKey;
pub use content::{ContentBlob, DEFAULT_EXTENSION, OCTET_STREAM};
pub use error::{BoxedError, Error, ErrorKind, Result};
pub use host::{UploadHost, UploadToken};
pub use pipeline::{UploadPipeline, UploadReceipt, UploadSettings};
pub use provider::ProviderConfig;
pub use source::SourceReference;
pub use transcode::{CwebpTranscoder, TranscodeService, Transcoder, WebpQuality};
pub use upload::{UploadError, UploadProvider, UploadRequest, UploadService};
