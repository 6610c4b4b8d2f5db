use std::fmt;
use std::sync::Arc;

use ndarray::{ArrayView4, CowArray};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::Session;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};

use crate::error::ClassifierError;

/// A loaded model that maps one preprocessed batch to per-class scores.
///
/// Implementations must be safe to call concurrently; the service shares a
/// single instance between all requests.
pub trait Classifier: Send + Sync {
    fn class_scores(&self, input: ArrayView4<'_, f32>) -> Result<Vec<f32>, ClassifierError>;
}

pub struct OnnxModel {
    provider: [ort::execution_providers::ExecutionProviderDispatch; 1],
}

impl OnnxModel {
    pub fn new(cuda: bool) -> Self {
        let provider = if cuda {
            [CUDAExecutionProvider::default().build().error_on_failure()]
        } else {
            [CPUExecutionProvider::default().build()]
        };
        Self { provider }
    }

    pub fn load_model(&self, model_path: &str) -> Result<Session, ort::Error> {
        let session = SessionBuilder::new()?
            .with_execution_providers(self.provider.clone())?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path)?;
        Ok(session)
    }
}

/// ONNX Runtime session producing class probabilities from its first output.
pub struct OnnxClassifier {
    session: Session,
}

impl fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("session", &"ort::Session")
            .finish()
    }
}

impl OnnxClassifier {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

impl Classifier for OnnxClassifier {
    fn class_scores(&self, input: ArrayView4<'_, f32>) -> Result<Vec<f32>, ClassifierError> {
        let xs = CowArray::from(input.into_dyn());
        let input_data = ort::inputs![xs.view()]?;
        let ys = self.session.run(input_data)?;

        let (_name, scores) = ys
            .iter()
            .next()
            .ok_or_else(|| ClassifierError::Inference("model returned no outputs".to_string()))?;
        let scores = scores.try_extract_tensor::<f32>()?;
        Ok(scores.iter().copied().collect())
    }
}

/// Load the model once at startup.
///
/// A failed load is logged and yields `None`; the server keeps running and
/// answers every prediction with the model-unavailable error.
pub fn load_classifier(model_path: &str, cuda: bool) -> Option<Arc<dyn Classifier>> {
    tracing::info!(model = model_path, cuda, "Loading model...");
    match OnnxModel::new(cuda).load_model(model_path) {
        Ok(session) => {
            tracing::info!(model = model_path, "Model loaded successfully");
            Some(Arc::new(OnnxClassifier::new(session)))
        }
        Err(e) => {
            tracing::error!(model = model_path, error = %e, "Error loading model");
            None
        }
    }
}
