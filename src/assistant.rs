use thiserror::Error;

use crate::chat::{AnswerPayload, Responder, Transcript};
use crate::client::{ClientError, PredictionClient, PredictionResponse};
use crate::error::ReportError;
use crate::report::{PatientRecord, REPORT_FILE_NAME, ReportSynthesizer};
use crate::service::PredictionResult;

/// Shown instead of the raw error when the prediction server is unreachable.
pub const CONNECTION_HELP: &str = "Cannot connect to prediction server!\n\
    Please make sure:\n\
    1. The backend is running: `mri-assist serve --model <model.onnx>`\n\
    2. The server is reachable at the configured URL (default http://localhost:5000)\n\
    3. No firewall is blocking the port";

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("cannot build report: {0}")]
    Report(#[from] ReportError),
}

impl AnalysisError {
    /// Text to show the user. Nothing is retried.
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::Client(ClientError::Connection { .. }) => CONNECTION_HELP.to_string(),
            AnalysisError::Client(e @ ClientError::Status { .. }) => format!("Error: {e}"),
            other => format!("Error during analysis: {other}"),
        }
    }
}

/// Outcome of one MRI analysis, ready for display and download.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub response: PredictionResponse,
    pub report: Vec<u8>,
    pub report_file_name: &'static str,
}

impl Analysis {
    pub fn result(&self) -> &PredictionResult {
        &self.response.result
    }
}

/// Chat session driving the responder, the inference service and the report.
pub struct Assistant<R: Responder> {
    responder: R,
    client: PredictionClient,
    reports: ReportSynthesizer,
    transcript: Transcript,
}

impl<R: Responder> Assistant<R> {
    pub fn new(responder: R, client: PredictionClient, reports: ReportSynthesizer) -> Self {
        Self {
            responder,
            client,
            reports,
            transcript: Transcript::default(),
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn clear(&mut self) {
        self.transcript.clear();
    }

    /// Record the question and the responder's answer.
    pub fn ask(&mut self, question: &str) -> AnswerPayload {
        self.transcript.push_user(question);
        let answer = self.responder.respond(question);
        self.transcript.push_assistant(answer.clone());
        answer
    }

    /// Classify an image remotely, render its report and log a summary turn.
    pub async fn analyze(
        &mut self,
        image_bytes: &[u8],
        patient: &PatientRecord,
    ) -> Result<Analysis, AnalysisError> {
        let response = self.client.predict(image_bytes).await?;
        let report = self.reports.generate(
            patient,
            &response.result.label,
            response.result.confidence,
        )?;
        self.transcript.push_assistant(analysis_message(&response.result));

        Ok(Analysis {
            response,
            report,
            report_file_name: REPORT_FILE_NAME,
        })
    }
}

/// Assistant turn summarizing a classification.
pub fn analysis_message(result: &PredictionResult) -> AnswerPayload {
    AnswerPayload {
        answer: format!(
            "🔬 MRI Analysis Complete\n\n\
             Detected: {}\n\
             Confidence: {:.2}%\n\n\
             ⚕️ Please consult a radiologist or neurologist for professional interpretation \
             and treatment planning.",
            result.label.to_uppercase(),
            result.confidence
        ),
        confidence: result.confidence,
        category: "mri_analysis".to_string(),
        matched: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{FaqResponder, MessageContent, Role};
    use crate::client::DEFAULT_TIMEOUT;

    fn offline_assistant() -> Assistant<FaqResponder> {
        let client = PredictionClient::new("http://127.0.0.1:9", DEFAULT_TIMEOUT).unwrap();
        Assistant::new(FaqResponder::default(), client, ReportSynthesizer::default())
    }

    #[test]
    fn ask_appends_question_and_answer() {
        let mut assistant = offline_assistant();
        let answer = assistant.ask("What are the symptoms?");
        assert!(answer.matched);

        let messages = assistant.transcript().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(
            messages[1].content,
            MessageContent::Answer(answer)
        );

        assistant.clear();
        assert!(assistant.transcript().is_empty());
    }

    #[test]
    fn analysis_message_summarizes_result() {
        let payload = analysis_message(&PredictionResult {
            label: "pituitary_tumor".to_string(),
            confidence: 88.15,
        });
        assert!(payload.answer.contains("Detected: PITUITARY_TUMOR"));
        assert!(payload.answer.contains("Confidence: 88.15%"));
        assert_eq!(payload.category, "mri_analysis");
        assert!(payload.matched);
        assert_eq!(payload.confidence, 88.15);

        let whole = analysis_message(&PredictionResult {
            label: "glioma_tumor".to_string(),
            confidence: 82.0,
        });
        assert!(whole.answer.contains("Confidence: 82.00%"), "{}", whole.answer);
    }

    #[test]
    fn user_messages_are_presentational() {
        let status = AnalysisError::Client(ClientError::Status {
            status: 500,
            body: r#"{"error":"Model not loaded"}"#.to_string(),
        });
        assert_eq!(
            status.user_message(),
            r#"Error: Server returned status code 500: {"error":"Model not loaded"}"#
        );

        let report = AnalysisError::Report(ReportError::Write("disk full".to_string()));
        assert!(report.user_message().starts_with("Error during analysis:"));
    }

    #[tokio::test]
    async fn unreachable_server_shows_remediation() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = PredictionClient::new(format!("http://{addr}"), DEFAULT_TIMEOUT).unwrap();
        let mut assistant =
            Assistant::new(FaqResponder::default(), client, ReportSynthesizer::default());
        let err = assistant
            .analyze(&crate::service::tests::png(8, 8), &PatientRecord::default())
            .await
            .unwrap_err();

        assert_eq!(err.user_message(), CONNECTION_HELP);
        assert!(assistant.transcript().is_empty());
    }
}
