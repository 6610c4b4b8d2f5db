use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Reply produced by a [`Responder`], also used for synthesized assistant turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerPayload {
    pub answer: String,
    /// Percentage in [0, 100].
    pub confidence: f64,
    pub category: String,
    pub matched: bool,
}

impl AnswerPayload {
    pub fn level(&self) -> ConfidenceLevel {
        ConfidenceLevel::from_percentage(self.confidence)
    }
}

/// Answer text followed by its confidence badge.
impl fmt::Display for AnswerPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n  Confidence: {:.2}% ({})",
            self.answer,
            self.confidence,
            self.level()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn from_percentage(confidence: f64) -> Self {
        if confidence >= 70.0 {
            ConfidenceLevel::High
        } else if confidence >= 40.0 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceLevel::High => write!(f, "High"),
            ConfidenceLevel::Medium => write!(f, "Medium"),
            ConfidenceLevel::Low => write!(f, "Low"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Answer(AnswerPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.role, &self.content) {
            (Role::User, MessageContent::Text(text)) => write!(f, "You: {text}"),
            (Role::User, MessageContent::Answer(payload)) => write!(f, "You: {}", payload.answer),
            (Role::Assistant, MessageContent::Text(text)) => write!(f, "Assistant: {text}"),
            (Role::Assistant, MessageContent::Answer(payload)) => write!(f, "Assistant: {payload}"),
        }
    }
}

/// Ordered log of the session's chat turns.
///
/// Messages are only ever appended; [`Transcript::clear`] starts a new session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn push_user(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        });
    }

    pub fn push_assistant(&mut self, payload: AnswerPayload) {
        self.messages.push(ChatMessage {
            role: Role::Assistant,
            content: MessageContent::Answer(payload),
        });
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

/// Question answering capability consumed by the assistant.
///
/// The matching engine behind it is opaque to the front-end.
pub trait Responder: Send + Sync {
    fn respond(&self, question: &str) -> AnswerPayload;
}

pub const QUICK_QUESTIONS: [&str; 8] = [
    "What is a brain tumor?",
    "What are the symptoms?",
    "What is glioma?",
    "What is meningioma?",
    "What is a pituitary tumor?",
    "How are tumors diagnosed?",
    "What are treatment options?",
    "Can I upload my MRI?",
];

const FAQ: [(&str, &str, &str); 8] = [
    (
        QUICK_QUESTIONS[0],
        "general",
        "A brain tumor is an abnormal growth of cells in or around the brain. Tumors can be benign \
         (non-cancerous) or malignant, and can start in the brain or spread there from elsewhere.",
    ),
    (
        QUICK_QUESTIONS[1],
        "symptoms",
        "Common symptoms include persistent headaches, seizures, nausea, vision or hearing problems, \
         balance difficulties, and changes in personality or memory. Symptoms depend on tumor size and location.",
    ),
    (
        QUICK_QUESTIONS[2],
        "glioma",
        "Glioma is a tumor that arises from glial cells in the brain or spinal cord. It can grow \
         aggressively and often needs prompt evaluation and treatment.",
    ),
    (
        QUICK_QUESTIONS[3],
        "meningioma",
        "Meningioma grows from the meninges, the membranes covering the brain and spinal cord. \
         Most are slow-growing and benign, but they still need medical supervision.",
    ),
    (
        QUICK_QUESTIONS[4],
        "pituitary",
        "A pituitary tumor forms in the pituitary gland at the base of the brain. Most are benign \
         but they can disturb hormone levels and affect vision.",
    ),
    (
        QUICK_QUESTIONS[5],
        "diagnosis",
        "Diagnosis usually combines a neurological exam with imaging such as MRI or CT, and sometimes \
         a biopsy to determine the exact tumor type.",
    ),
    (
        QUICK_QUESTIONS[6],
        "treatment",
        "Treatment options include surgery, radiation therapy, chemotherapy, targeted therapy, and \
         monitoring. The right plan depends on tumor type, size, location, and overall health.",
    ),
    (
        QUICK_QUESTIONS[7],
        "mri_upload",
        "Yes. Use the MRI analysis command to upload a JPG or PNG brain scan. The result is a screening \
         aid only and must be reviewed by a radiologist.",
    ),
];

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("static pattern"));

fn normalize(question: &str) -> String {
    NON_WORD
        .replace_all(&question.to_lowercase(), " ")
        .trim()
        .to_string()
}

/// Answers the built-in quick questions; anything else gets an unmatched reply.
#[derive(Debug, Clone)]
pub struct FaqResponder {
    entries: HashMap<String, (&'static str, &'static str)>,
}

impl Default for FaqResponder {
    fn default() -> Self {
        let entries = FAQ
            .iter()
            .map(|(question, category, answer)| (normalize(question), (*category, *answer)))
            .collect();
        Self { entries }
    }
}

impl Responder for FaqResponder {
    fn respond(&self, question: &str) -> AnswerPayload {
        match self.entries.get(&normalize(question)) {
            Some((category, answer)) => AnswerPayload {
                answer: answer.to_string(),
                confidence: 100.0,
                category: category.to_string(),
                matched: true,
            },
            None => AnswerPayload {
                answer: "I'm not sure about that. Try asking about brain tumor types, symptoms, \
                         diagnosis or treatment, or pick one of the quick questions."
                    .to_string(),
                confidence: 0.0,
                category: "unknown".to_string(),
                matched: false,
            },
        }
    }
}
