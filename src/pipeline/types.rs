//! Request, response and error types shared by the pipeline and its outer surfaces.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::extraction::DocumentOutcome;
use crate::generation::GenerationError;
use crate::store::{NotFound, Turn};

/// Errors surfaced by [`crate::pipeline::MedbriefApi`] operations.
///
/// Per-document extraction failures are not errors; they travel as outcome data on the
/// analysis record. Nothing is stored on any error path.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Request is missing or malformed in a way the client can correct.
    #[error("{0}")]
    InvalidInput(String),
    /// No uploaded document produced any text.
    #[error("Could not extract text from any of the uploaded documents")]
    AggregateEmpty {
        /// Outcome of every document in the request, in request order.
        documents: Vec<DocumentOutcome>,
    },
    /// Generation provider failed or timed out.
    #[error("{0}")]
    Generation(#[from] GenerationError),
    /// Analysis or conversation id is unknown.
    #[error(transparent)]
    NotFound(#[from] NotFound),
}

/// Body of a chat request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// New user message.
    pub message: String,
    /// Stored analysis whose context grounds the reply.
    #[serde(default)]
    pub analysis_id: Option<String>,
    /// Inline context, used when no analysis id is given.
    #[serde(default)]
    pub medical_context: Option<String>,
    /// Conversation to continue; omitted or unknown ids start a new one.
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// Reply to a chat request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    /// Conversation the turn was appended to.
    pub conversation_id: String,
    /// Generated answer.
    pub response: String,
    /// Time the turn was recorded.
    pub timestamp: String,
    /// Number of turns in the conversation after this one.
    pub message_count: usize,
}

/// Stored conversation as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    /// Conversation id.
    pub conversation_id: String,
    /// Turns, oldest first.
    pub history: Vec<Turn>,
    /// Number of turns.
    pub message_count: usize,
}

impl ConversationView {
    pub(crate) fn new(conversation_id: String, history: Vec<Turn>) -> Self {
        Self {
            message_count: history.len(),
            conversation_id,
            history,
        }
    }
}
