//! OCR service client
//!
//! The scanner never runs text recognition locally: a label image is
//! posted to the configured OCR service and the raw recognized text comes
//! back as a single string. The analysis layer consumes exactly that
//! string.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{encode_image, http_client, CollaboratorError};

/// Anything that can turn a label image into raw text.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Recognize text in an image. Returns the raw text verbatim; an
    /// empty string is a valid answer for a blank image.
    async fn recognize(&self, image: &[u8]) -> Result<String, CollaboratorError>;
}

/// HTTP client for the external OCR service.
pub struct OcrClient {
    http: reqwest::Client,
    endpoint: String,
    language: String,
}

#[derive(Debug, Serialize)]
struct RecognizeRequest<'a> {
    image: &'a str,
    language: &'a str,
}

#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    text: Option<String>,
}

impl OcrClient {
    /// Create a client for the given endpoint.
    pub fn new(
        endpoint: impl Into<String>,
        language: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CollaboratorError> {
        Ok(Self {
            http: http_client(timeout)?,
            endpoint: endpoint.into(),
            language: language.into(),
        })
    }
}

#[async_trait]
impl TextRecognizer for OcrClient {
    async fn recognize(&self, image: &[u8]) -> Result<String, CollaboratorError> {
        let payload = encode_image(image);
        let response = self
            .http
            .post(&self.endpoint)
            .json(&RecognizeRequest {
                image: &payload,
                language: &self.language,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::Status {
                url: self.endpoint.clone(),
                status,
            });
        }

        let body: RecognizeResponse = response.json().await?;
        let text = body.text.ok_or_else(|| {
            CollaboratorError::Incomplete("recognized text missing from OCR response".to_string())
        })?;

        debug!(chars = text.len(), "ocr service returned text");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognize_response_shape() {
        let body: RecognizeResponse = serde_json::from_str(r#"{"text":"MRP ₹99"}"#).unwrap();
        assert_eq!(body.text.as_deref(), Some("MRP ₹99"));

        let body: RecognizeResponse = serde_json::from_str("{}").unwrap();
        assert!(body.text.is_none());
    }

    #[test]
    fn test_recognize_request_shape() {
        let json = serde_json::to_string(&RecognizeRequest {
            image: "aGVsbG8=",
            language: "en-IN",
        })
        .unwrap();
        assert_eq!(json, r#"{"image":"aGVsbG8=","language":"en-IN"}"#);
    }
}
