use thiserror::Error;

/// Failures of the classification pipeline, from raw upload bytes to a label.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// The uploaded bytes could not be decoded as an image.
    #[error("cannot identify image file: {0}")]
    Decode(#[from] image::ImageError),

    /// No model was loaded at startup.
    #[error("Model not loaded")]
    ModelUnavailable,

    #[error("preprocessing failed: {0}")]
    Preprocess(String),

    #[error("model run failed: {0}")]
    Inference(String),

    #[error("model produced {got} scores for {expected} classes")]
    ClassCount { expected: usize, got: usize },
}

impl From<ort::Error> for ClassifierError {
    fn from(e: ort::Error) -> Self {
        ClassifierError::Inference(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to encode report content: {0}")]
    Encode(String),

    #[error("failed to write report document: {0}")]
    Write(String),
}
