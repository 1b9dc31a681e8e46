//! Remote collaborators
//!
//! Thin HTTP clients for the services the scanner leans on: the OCR
//! service, the vision-annotation service, and the product catalog
//! backend. Failures surface as typed [`CollaboratorError`]s so the
//! orchestration layer can decide between fallback and user-visible
//! error; nothing in this layer retries on its own.

pub mod annotate;
pub mod catalog;
pub mod ocr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures_util::StreamExt;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub use annotate::{AnnotationClient, ImageAnnotator};
pub use catalog::{CachedCatalog, CatalogClient, FieldMatch, LookupCache, ProductInfo, RemoteSummary};
pub use ocr::{OcrClient, TextRecognizer};

/// Errors from an external collaborator service.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// The request could not be completed (connect, timeout, body read).
    #[error("service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },

    /// The service answered 2xx but the payload is unusable.
    #[error("incomplete response: {0}")]
    Incomplete(String),

    /// No endpoint is configured for this collaborator.
    #[error("no {0} endpoint configured")]
    NotConfigured(&'static str),
}

/// Build the shared HTTP client with a per-request timeout.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, CollaboratorError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Encode image bytes for a JSON request body.
pub(crate) fn encode_image(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Download an image over HTTP, streaming the body into memory.
pub async fn fetch_image(
    client: &reqwest::Client,
    url: &str,
) -> Result<Vec<u8>, CollaboratorError> {
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(CollaboratorError::Status {
            url: url.to_string(),
            status,
        });
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        bytes.extend_from_slice(&chunk?);
    }

    debug!(url, size = bytes.len(), "downloaded reference image");

    if bytes.is_empty() {
        return Err(CollaboratorError::Incomplete(format!("{url} returned an empty body")));
    }

    Ok(bytes)
}
