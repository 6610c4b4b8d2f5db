pub mod assistant;
pub mod chat;
pub mod cli;
pub mod client;
pub mod error;
pub mod mapping;
pub mod model;
pub mod postprocess;
pub mod preprocess;
pub mod report;
pub mod server;
pub mod service;
pub mod tumor_info;

pub use crate::assistant::{Analysis, AnalysisError, Assistant};
pub use crate::chat::{AnswerPayload, ChatMessage, FaqResponder, Responder, Transcript};
pub use crate::cli::Args;
pub use crate::client::{ClientError, PredictionClient, PredictionResponse};
pub use crate::error::{ClassifierError, ReportError};
pub use crate::mapping::{default_labels, load_class_mapping};
pub use crate::model::{Classifier, OnnxClassifier, OnnxModel, load_classifier};
pub use crate::preprocess::{PreprocessConfig, Processor, TensorLayout};
pub use crate::report::{PatientRecord, ReportSynthesizer};
pub use crate::server::router;
pub use crate::service::{InferenceService, PredictionResult};
pub use crate::tumor_info::TumorInfo;
