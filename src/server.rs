use std::sync::Arc;

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::ClassifierError;
use crate::service::{InferenceService, PredictionResult};

pub const LIVENESS_MESSAGE: &str = "🧠 Brain Tumor Detection API is Running!";

/// Default cap on the request body accepted by `/predict`.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

const FILE_FIELD: &str = "file";

/// Failures of `/predict`, each rendered as `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Model not loaded")]
    ModelUnavailable,

    #[error("No file provided")]
    MissingFile,

    #[error("No file selected")]
    EmptyFilename,

    #[error("{0}")]
    Upload(#[from] MultipartError),

    #[error("{0}")]
    Processing(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFile | ApiError::EmptyFilename => StatusCode::BAD_REQUEST,
            ApiError::Upload(e) => e.status(),
            ApiError::ModelUnavailable | ApiError::Processing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ClassifierError> for ApiError {
    fn from(e: ClassifierError) -> Self {
        match e {
            ClassifierError::ModelUnavailable => ApiError::ModelUnavailable,
            other => ApiError::Processing(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(%status, error = %self, "prediction failed");
        } else {
            tracing::warn!(%status, error = %self, "rejected prediction request");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn router(service: Arc<InferenceService>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/predict", post(predict))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn home() -> &'static str {
    LIVENESS_MESSAGE
}

async fn predict(
    State(service): State<Arc<InferenceService>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
    if !service.is_ready() {
        return Err(ApiError::ModelUnavailable);
    }

    // A request that is not multipart carries no file field.
    let Ok(mut multipart) = multipart else {
        return Err(ApiError::MissingFile);
    };

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        // A part without a filename is a plain form value, not an upload.
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field.bytes().await?;
        upload = Some((file_name, bytes));
        break;
    }

    let (file_name, bytes) = upload.ok_or(ApiError::MissingFile)?;
    if file_name.is_empty() {
        return Err(ApiError::EmptyFilename);
    }

    tracing::info!(file = %file_name, size = bytes.len(), "analyzing upload");
    let result = tokio::task::spawn_blocking(move || service.predict(&bytes))
        .await
        .map_err(|e| ApiError::Processing(e.to_string()))??;

    tracing::info!(label = %result.label, confidence = result.confidence, "prediction complete");
    Ok(Json(result))
}
