use std::collections::BTreeMap;
use std::io::Cursor;
use std::time::Duration;

use image::ImageFormat;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::service::PredictionResult;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Body of a successful `POST /predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    #[serde(flatten)]
    pub result: PredictionResult,
    /// Per-class percentages; only present if the server chooses to send them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_predictions: Option<BTreeMap<String, f64>>,
}

impl PredictionResponse {
    /// Detailed probabilities, highest first. Empty when the server sent none.
    pub fn ranked_predictions(&self) -> Vec<(&str, f64)> {
        let mut ranked: Vec<(&str, f64)> = self
            .all_predictions
            .iter()
            .flatten()
            .map(|(label, pct)| (label.as_str(), *pct))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Cannot connect to prediction server at {url}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Server returned status code {status}: {body}")]
    Status { status: u16, body: String },

    #[error("cannot read image: {0}")]
    Image(#[from] image::ImageError),

    #[error("{0}")]
    Request(#[from] reqwest::Error),
}

/// Calls the inference service over HTTP.
#[derive(Debug, Clone)]
pub struct PredictionClient {
    http: reqwest::Client,
    base_url: String,
}

impl PredictionClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn predict_url(&self) -> String {
        format!("{}/predict", self.base_url.trim_end_matches('/'))
    }

    /// Upload one image as multipart field `file`. Never retried.
    pub async fn predict(&self, image_bytes: &[u8]) -> Result<PredictionResponse, ClientError> {
        let png = reencode_png(image_bytes)?;
        let part = Part::bytes(png)
            .file_name("image.png")
            .mime_str("image/png")?;
        let form = Form::new().part("file", part);

        let url = self.predict_url();
        tracing::debug!(%url, "sending image for analysis");
        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ClientError::Connection { url: url.clone(), source: e }
                } else {
                    ClientError::Request(e)
                }
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), %body, "prediction request failed");
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<PredictionResponse>().await?)
    }
}

/// Decode the upload locally and send it as PNG.
pub fn reencode_png(image_bytes: &[u8]) -> Result<Vec<u8>, image::ImageError> {
    let image = image::load_from_memory(image_bytes)?;
    let mut cursor = Cursor::new(Vec::new());
    image.write_to(&mut cursor, ImageFormat::Png)?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::AnalysisError;
    use crate::server::router;
    use crate::service::tests::{png, service_with};
    use std::sync::Arc;

    async fn spawn_server(scores: Vec<f32>) -> String {
        let app = router(Arc::new(service_with(scores)), 1 << 20);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn confidence_round_trips_through_http() {
        let url = spawn_server(vec![0.1, 0.123456, 0.7, 0.076544]).await;
        let client = PredictionClient::new(url, DEFAULT_TIMEOUT).unwrap();

        let response = client.predict(&png(40, 30)).await.unwrap();
        assert_eq!(response.result.label, "no_tumor");
        assert_eq!(response.result.confidence, 70.0);
        assert!(response.all_predictions.is_none());
        assert!(response.ranked_predictions().is_empty());
    }

    #[tokio::test]
    async fn refused_connection_is_reported_as_connection_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = PredictionClient::new(format!("http://{addr}"), DEFAULT_TIMEOUT).unwrap();
        let err = client.predict(&png(8, 8)).await.unwrap_err();
        assert!(matches!(err, ClientError::Connection { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn timeout_expiry_is_a_generic_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let client =
            PredictionClient::new(format!("http://{addr}"), Duration::from_millis(300)).unwrap();
        let err = client.predict(&png(8, 8)).await.unwrap_err();
        let ClientError::Request(source) = &err else {
            panic!("expected a request failure, got {err:?}");
        };
        assert!(source.is_timeout(), "{source:?}");

        let message = AnalysisError::Client(err).user_message();
        assert!(message.starts_with("Error during analysis:"), "{message}");
    }

    #[tokio::test]
    async fn non_image_upload_fails_before_sending() {
        let client = PredictionClient::new("http://127.0.0.1:9", DEFAULT_TIMEOUT).unwrap();
        let err = client.predict(b"plain text").await.unwrap_err();
        assert!(matches!(err, ClientError::Image(_)));
    }

    #[test]
    fn detailed_probabilities_are_optional_and_ranked() {
        let bare: PredictionResponse =
            serde_json::from_str(r#"{"prediction":"glioma_tumor","confidence":82.0}"#).unwrap();
        assert_eq!(bare.result.confidence, 82.0);
        assert!(bare.all_predictions.is_none());

        let detailed: PredictionResponse = serde_json::from_str(
            r#"{"prediction":"glioma_tumor","confidence":82.0,
                "all_predictions":{"no_tumor":10.0,"glioma_tumor":82.0,"pituitary_tumor":3.0}}"#,
        )
        .unwrap();
        assert_eq!(
            detailed.ranked_predictions(),
            vec![("glioma_tumor", 82.0), ("no_tumor", 10.0), ("pituitary_tumor", 3.0)]
        );
    }
}
