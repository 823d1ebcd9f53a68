use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::context::{ChatMessage, ConversationContextBuilder};
use super::prompts::PROBE_PROMPT;
use super::tokens::TokenEstimator;
use super::{CompletionRequest, GenerationClient, GenerationError};
use crate::config::Config;
use crate::store::Turn;

const PROBE_MAX_TOKENS: u32 = 100;

/// Limits applied to every generation call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    /// Output token ceiling for summaries.
    pub summary_max_tokens: u32,
    /// Output token ceiling for chat replies.
    pub chat_max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Bound on one round trip.
    pub timeout: Duration,
}

impl GenerationSettings {
    /// Settings taken from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            summary_max_tokens: config.summary_max_tokens,
            chat_max_tokens: config.chat_max_tokens,
            temperature: config.generation_temperature,
            timeout: config.generation_timeout(),
        }
    }
}

/// Result of a provider reachability probe.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationHealth {
    /// Whether the provider produced a completion.
    pub reachable: bool,
    /// Provider name.
    pub provider: String,
    /// Model name.
    pub model: String,
    /// Round-trip time in milliseconds.
    pub latency_ms: u64,
    /// Failure description when unreachable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary and chat facade over a [`GenerationClient`].
///
/// Owns prompt construction, history replay and the per-call timeout. Holds no conversation
/// state; callers pass the history in on every chat call.
pub struct SummaryGenerator {
    client: Arc<dyn GenerationClient>,
    builder: ConversationContextBuilder,
    tokens: TokenEstimator,
    settings: GenerationSettings,
}

impl SummaryGenerator {
    /// Wrap `client`, using its framing variant and a token estimator for its model.
    pub fn new(client: Arc<dyn GenerationClient>, settings: GenerationSettings) -> Self {
        let builder = ConversationContextBuilder::new(client.framing());
        let tokens = TokenEstimator::for_model(client.model());
        Self {
            client,
            builder,
            tokens,
            settings,
        }
    }

    /// Estimated token size of `text` for the configured model.
    pub fn estimate_tokens(&self, text: &str) -> usize {
        self.tokens.count(text)
    }

    /// Generate the three-section summary for an aggregated context.
    ///
    /// The context must be non-empty; the analysis pipeline rejects empty aggregates before
    /// reaching this point.
    pub async fn generate(&self, context: &str) -> Result<String, GenerationError> {
        let messages = self.builder.build_summary_request(context);
        self.complete("summary", messages, self.settings.summary_max_tokens)
            .await
    }

    /// Answer `message` given the patient context and the prior turns, oldest first.
    pub async fn chat(
        &self,
        context: &str,
        history: &[Turn],
        message: &str,
    ) -> Result<String, GenerationError> {
        let messages = self.builder.build_request(context, history, message);
        tracing::debug!(
            replayed_turns = history.len(),
            messages = messages.len(),
            "Replaying conversation history"
        );
        self.complete("chat", messages, self.settings.chat_max_tokens)
            .await
    }

    /// Send a short fixed prompt to check that the provider answers.
    pub async fn probe(&self) -> GenerationHealth {
        let started = Instant::now();
        let result = self
            .complete(
                "probe",
                vec![ChatMessage::user(PROBE_PROMPT)],
                PROBE_MAX_TOKENS,
            )
            .await;
        GenerationHealth {
            reachable: result.is_ok(),
            provider: self.client.provider().to_string(),
            model: self.client.model().to_string(),
            latency_ms: started.elapsed().as_millis() as u64,
            error: result.err().map(|error| error.to_string()),
        }
    }

    async fn complete(
        &self,
        operation: &'static str,
        messages: Vec<ChatMessage>,
        max_tokens: u32,
    ) -> Result<String, GenerationError> {
        let prompt_tokens = self.tokens.count_messages(&messages);
        let request = CompletionRequest {
            messages,
            max_tokens,
            temperature: self.settings.temperature,
        };
        let started = Instant::now();

        let result = match tokio::time::timeout(self.settings.timeout, self.client.complete(request))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout(self.settings.timeout)),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(text) => tracing::info!(
                operation,
                provider = self.client.provider(),
                model = self.client.model(),
                prompt_tokens,
                tokenizer = self.tokens.tokenizer(),
                completion_tokens = self.tokens.count(text),
                elapsed_ms,
                "Generation completed"
            ),
            Err(error) => tracing::error!(
                operation,
                provider = self.client.provider(),
                model = self.client.model(),
                prompt_tokens,
                elapsed_ms,
                error = %error,
                "Generation failed"
            ),
        }
        result
    }
}
