//! Core data model types for vedro.
//!
//! These are the shapes that flow between the tutor engine, the model, and
//! the renderers. Field names serialize in camelCase because the same JSON is
//! shown to the model as its output contract.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// What the user sends to the chat tutor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatbotInput {
    /// The user's message.
    pub message: String,
    /// Optional attachment as `data:<mimetype>;base64,<encoded_data>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_data_uri: Option<String>,
}

impl ChatbotInput {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            file_data_uri: None,
        }
    }

    pub fn with_file(mut self, data_uri: impl Into<String>) -> Self {
        self.file_data_uri = Some(data_uri.into());
        self
    }
}

/// A parsed `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri<'a> {
    pub mime_type: &'a str,
    pub payload: &'a str,
}

/// Why an attachment URI was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataUriError {
    #[error("attachment must start with 'data:'")]
    MissingScheme,

    #[error("attachment must be base64 encoded (';base64,')")]
    NotBase64Encoded,

    #[error("invalid attachment MIME type '{0}'")]
    InvalidMimeType(String),

    #[error("attachment payload is empty")]
    EmptyPayload,

    #[error("attachment payload is not valid base64")]
    InvalidPayload,
}

/// Parse and validate a base64 `data:` URI.
pub fn parse_data_uri(uri: &str) -> Result<DataUri<'_>, DataUriError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or(DataUriError::MissingScheme)?;
    let (mime_type, payload) = rest
        .split_once(";base64,")
        .ok_or(DataUriError::NotBase64Encoded)?;

    let valid_mime = mime_type
        .split_once('/')
        .is_some_and(|(kind, sub)| !kind.is_empty() && !sub.is_empty());
    if !valid_mime {
        return Err(DataUriError::InvalidMimeType(mime_type.to_string()));
    }
    if payload.is_empty() {
        return Err(DataUriError::EmptyPayload);
    }
    let valid_payload = payload
        .trim_end_matches('=')
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/');
    if !valid_payload {
        return Err(DataUriError::InvalidPayload);
    }

    Ok(DataUri { mime_type, payload })
}

/// A distinct idea inside a learning pack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyLearningPoint {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CauseEffect {
    pub cause: String,
    pub effect: String,
}

/// One multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

/// Structured tutoring content generated for a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPack {
    pub simple_summary: String,
    #[serde(default)]
    pub key_learning_points: Vec<KeyLearningPoint>,
    #[serde(default)]
    pub step_by_step_explanation: Vec<String>,
    #[serde(default)]
    pub cause_and_effect: Vec<CauseEffect>,
    #[serde(default)]
    pub quiz_questions: Vec<QuizQuestion>,
}

impl LearningPack {
    /// The error object shown when a pack cannot be produced for `topic`.
    pub fn fallback(topic: &str) -> Self {
        Self {
            simple_summary: format!(
                "The pages on \"{}\" are smudged beyond reading right now. \
                 The Alchemist could not prepare this lesson; please try again in a little while.",
                topic.trim()
            ),
            key_learning_points: Vec::new(),
            step_by_step_explanation: Vec::new(),
            cause_and_effect: Vec::new(),
            quiz_questions: Vec::new(),
        }
    }

    /// Returns `true` if this is the output of [`LearningPack::fallback`] or a
    /// greeting-shaped pack (summary only).
    pub fn is_summary_only(&self) -> bool {
        self.key_learning_points.is_empty()
            && self.step_by_step_explanation.is_empty()
            && self.cause_and_effect.is_empty()
            && self.quiz_questions.is_empty()
    }
}

/// Plain conversational reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleReply {
    pub reply: String,
}

/// What the chat tutor answers with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ChatReply {
    SimpleReply(SimpleReply),
    LearningPack(LearningPack),
}

impl ChatReply {
    pub fn simple(reply: impl Into<String>) -> Self {
        ChatReply::SimpleReply(SimpleReply {
            reply: reply.into(),
        })
    }
}

/// AI commentary on a sandbox experiment, as Markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentExplanation {
    pub explanation: String,
}

/// Tagged success/failure result handed to front ends.
///
/// Serializes as `{"success": true, "response": ...}` or
/// `{"success": false, "error": "..."}`.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult<T> {
    Success(T),
    Failure { error: String },
}

impl<T> ActionResult<T> {
    pub fn failure(error: impl Into<String>) -> Self {
        ActionResult::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ActionResult::Success(_))
    }

    pub fn ok(self) -> Option<T> {
        match self {
            ActionResult::Success(v) => Some(v),
            ActionResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ActionResult::Success(_) => None,
            ActionResult::Failure { error } => Some(error),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ActionResult<U> {
        match self {
            ActionResult::Success(v) => ActionResult::Success(f(v)),
            ActionResult::Failure { error } => ActionResult::Failure { error },
        }
    }

    /// Convert into a `Result`, turning the user-facing message into an error.
    pub fn into_result(self) -> anyhow::Result<T> {
        match self {
            ActionResult::Success(v) => Ok(v),
            ActionResult::Failure { error } => Err(anyhow::anyhow!(error)),
        }
    }
}

impl<T: Serialize> Serialize for ActionResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ActionResult", 2)?;
        match self {
            ActionResult::Success(response) => {
                state.serialize_field("success", &true)?;
                state.serialize_field("response", response)?;
            }
            ActionResult::Failure { error } => {
                state.serialize_field("success", &false)?;
                state.serialize_field("error", error)?;
            }
        }
        state.end()
    }
}
