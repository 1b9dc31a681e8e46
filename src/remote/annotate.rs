//! Vision-annotation service client
//!
//! Supplies the label/color similarity strategy with its inputs: a set of
//! text labels and an ordered list of dominant colors for an image. An
//! answer with neither labels nor colors is treated as incomplete so the
//! caller can fall back to the local average-hash strategy.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{encode_image, http_client, CollaboratorError};
use crate::vision::{DominantColor, ImageAnnotation};

/// Anything that can annotate an image with labels and dominant colors.
#[async_trait]
pub trait ImageAnnotator: Send + Sync {
    async fn annotate(&self, image: &[u8]) -> Result<ImageAnnotation, CollaboratorError>;
}

/// HTTP client for the external vision-annotation service.
pub struct AnnotationClient {
    http: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct AnnotateRequest<'a> {
    image: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    colors: Vec<DominantColor>,
}

impl AnnotationClient {
    /// Create a client for the given endpoint.
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CollaboratorError> {
        Ok(Self {
            http: http_client(timeout)?,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl ImageAnnotator for AnnotationClient {
    async fn annotate(&self, image: &[u8]) -> Result<ImageAnnotation, CollaboratorError> {
        let payload = encode_image(image);
        let response = self
            .http
            .post(&self.endpoint)
            .json(&AnnotateRequest { image: &payload })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::Status {
                url: self.endpoint.clone(),
                status,
            });
        }

        let body: AnnotateResponse = response.json().await?;
        if body.labels.is_empty() && body.colors.is_empty() {
            return Err(CollaboratorError::Incomplete(
                "annotation service returned neither labels nor colors".to_string(),
            ));
        }

        debug!(
            labels = body.labels.len(),
            colors = body.colors.len(),
            "annotation service answered"
        );

        Ok(ImageAnnotation {
            labels: body.labels,
            colors: body.colors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotate_response_shape() {
        let body: AnnotateResponse = serde_json::from_str(
            r#"{"labels":["bottle","Brand logo"],"colors":[{"red":200,"green":40,"blue":40}]}"#,
        )
        .unwrap();
        assert_eq!(body.labels, vec!["bottle", "Brand logo"]);
        assert_eq!(
            body.colors,
            vec![DominantColor {
                red: 200,
                green: 40,
                blue: 40
            }]
        );
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let body: AnnotateResponse = serde_json::from_str("{}").unwrap();
        assert!(body.labels.is_empty());
        assert!(body.colors.is_empty());
    }
}
