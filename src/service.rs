use std::fmt;
use std::sync::Arc;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::ClassifierError;
use crate::model::Classifier;
use crate::postprocess::{argmax_and_max, softmax, to_percentage};
use crate::preprocess::Processor;

/// Outcome of one classification request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    #[serde(rename = "prediction")]
    pub label: String,
    /// Top class probability as a percentage, two decimals.
    pub confidence: f64,
}

/// Single-image classification over a model loaded at startup.
///
/// The classifier is `None` when loading failed; every call then reports
/// [`ClassifierError::ModelUnavailable`].
pub struct InferenceService {
    classifier: Option<Arc<dyn Classifier>>,
    processor: Processor,
    labels: Vec<String>,
    apply_softmax: bool,
}

impl fmt::Debug for InferenceService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceService")
            .field("ready", &self.is_ready())
            .field("processor", &self.processor)
            .field("labels", &self.labels)
            .field("apply_softmax", &self.apply_softmax)
            .finish()
    }
}

impl InferenceService {
    pub fn new(
        classifier: Option<Arc<dyn Classifier>>,
        processor: Processor,
        labels: Vec<String>,
    ) -> Self {
        Self {
            classifier,
            processor,
            labels,
            apply_softmax: false,
        }
    }

    /// Treat raw model outputs as logits.
    pub fn with_softmax(mut self, apply_softmax: bool) -> Self {
        self.apply_softmax = apply_softmax;
        self
    }

    pub fn is_ready(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn predict(&self, image_bytes: &[u8]) -> Result<PredictionResult, ClassifierError> {
        let classifier = self
            .classifier
            .as_ref()
            .ok_or(ClassifierError::ModelUnavailable)?;

        let input = self.processor.preprocess(image_bytes)?;
        let scores = Array1::from(classifier.class_scores(input.view())?);
        if scores.is_empty() || scores.len() != self.labels.len() {
            return Err(ClassifierError::ClassCount {
                expected: self.labels.len(),
                got: scores.len(),
            });
        }

        let probs = if self.apply_softmax { softmax(&scores) } else { scores };
        let (idx, max_prob) = argmax_and_max(&probs);
        let result = PredictionResult {
            label: self.labels[idx].clone(),
            confidence: to_percentage(max_prob),
        };
        tracing::debug!(label = %result.label, confidence = result.confidence, "classified image");
        Ok(result)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::mapping::default_labels;
    use crate::preprocess::{PreprocessConfig, TensorLayout};
    use image::{DynamicImage, ImageFormat, RgbImage};
    use ndarray::ArrayView4;
    use std::io::Cursor;

    /// Returns the same scores for every input, after checking the input contract.
    pub(crate) struct FixedScores(pub Vec<f32>);

    impl Classifier for FixedScores {
        fn class_scores(&self, input: ArrayView4<'_, f32>) -> Result<Vec<f32>, ClassifierError> {
            assert_eq!(input.shape()[0], 1);
            Ok(self.0.clone())
        }
    }

    pub(crate) fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .unwrap();
        cursor.into_inner()
    }

    pub(crate) fn service_with(scores: Vec<f32>) -> InferenceService {
        InferenceService::new(
            Some(Arc::new(FixedScores(scores))),
            Processor::new(PreprocessConfig::square(32, TensorLayout::Nhwc)),
            default_labels(),
        )
    }

    #[test]
    fn picks_argmax_label_and_percentage() {
        let service = service_with(vec![0.82, 0.05, 0.10, 0.03]);
        let result = service.predict(&png(64, 48)).unwrap();
        assert_eq!(
            result,
            PredictionResult {
                label: "glioma_tumor".to_string(),
                confidence: 82.0
            }
        );
    }

    #[test]
    fn result_is_always_in_class_set_and_range() {
        for scores in [
            vec![0.1, 0.2, 0.3, 0.4],
            vec![0.0, 1.0, 0.0, 0.0],
            vec![0.25, 0.25, 0.25, 0.25],
        ] {
            let result = service_with(scores).predict(&png(10, 10)).unwrap();
            assert!(default_labels().contains(&result.label));
            assert!((0.0..=100.0).contains(&result.confidence));
        }
    }

    #[test]
    fn logits_are_normalized_when_requested() {
        let service = service_with(vec![0.0, 0.0, 5.0, 0.0]).with_softmax(true);
        let result = service.predict(&png(8, 8)).unwrap();
        assert_eq!(result.label, "no_tumor");
        assert!(result.confidence > 95.0 && result.confidence < 100.0);
    }

    #[test]
    fn unloaded_model_is_unavailable() {
        let service = InferenceService::new(None, Processor::new(PreprocessConfig::default()), default_labels());
        assert!(!service.is_ready());
        assert!(matches!(
            service.predict(&png(8, 8)),
            Err(ClassifierError::ModelUnavailable)
        ));
    }

    #[test]
    fn output_width_must_match_labels() {
        let err = service_with(vec![0.5, 0.5]).predict(&png(8, 8)).unwrap_err();
        assert!(matches!(err, ClassifierError::ClassCount { expected: 4, got: 2 }));
    }

    #[test]
    fn wire_format_uses_prediction_key() {
        let json = serde_json::to_value(PredictionResult {
            label: "no_tumor".to_string(),
            confidence: 97.5,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"prediction": "no_tumor", "confidence": 97.5}));
    }
}
