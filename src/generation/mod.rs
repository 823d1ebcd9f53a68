//! Text generation: provider clients, request framing, and the summary/chat facade.
//!
//! Every provider is reached over plain HTTP with `reqwest`; no vendor SDKs. A client only knows
//! how to turn a [`CompletionRequest`] into text for its API. Prompt wording, history replay and
//! timeouts live in [`SummaryGenerator`], so the three backends behave identically apart from how
//! they accept the framing block (see [`Framing`]).

mod anthropic;
pub mod context;
mod generator;
mod ollama;
mod openai;
pub mod prompts;
#[cfg(test)]
pub(crate) mod testing;
pub mod tokens;

pub use context::{ChatMessage, ConversationContextBuilder, Framing, Role};
pub use generator::{GenerationHealth, GenerationSettings, SummaryGenerator};
pub use tokens::TokenEstimator;

use crate::config::{Config, GenerationProvider};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by a generation round trip.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Provider could not be reached.
    #[error("Generation provider unavailable: {0}")]
    Unavailable(String),
    /// Provider did not answer within the configured bound.
    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),
    /// Provider answered with a non-success status.
    #[error("Generation provider rejected the request ({status}): {body}")]
    Rejected {
        /// HTTP status code returned by the provider.
        status: u16,
        /// Response body, as returned.
        body: String,
    },
    /// Provider response could not be decoded or held no text.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
    /// Provider is missing a required setting such as an API key.
    #[error("Generation provider not configured: {0}")]
    NotConfigured(String),
}

/// Provider-neutral completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Ordered messages, framing first.
    pub messages: Vec<ChatMessage>,
    /// Output token ceiling.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Interface implemented by generation backends.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Provider name used in logs and health responses.
    fn provider(&self) -> &'static str;

    /// Model identifier sent with each request.
    fn model(&self) -> &str;

    /// How this provider accepts the framing block.
    fn framing(&self) -> Framing;

    /// Run one completion and return the generated text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, GenerationError>;
}

/// Build the generation client selected by configuration.
pub fn get_generation_client(config: &Config) -> Result<Arc<dyn GenerationClient>, GenerationError> {
    let http = http_client(config.generation_timeout())?;
    let model = config.generation_model.clone();
    let base_url = config.generation_base_url.clone();

    let client: Arc<dyn GenerationClient> = match config.generation_provider {
        GenerationProvider::OpenAI => {
            let api_key = require_key(config.openai_api_key.as_deref(), "OPENAI_API_KEY")?;
            Arc::new(openai::OpenAiClient::new(http, base_url, api_key, model))
        }
        GenerationProvider::Anthropic => {
            let api_key = require_key(config.anthropic_api_key.as_deref(), "ANTHROPIC_API_KEY")?;
            Arc::new(anthropic::AnthropicClient::new(http, base_url, api_key, model))
        }
        GenerationProvider::Ollama => Arc::new(ollama::OllamaClient::new(http, base_url, model)),
    };
    tracing::info!(
        provider = client.provider(),
        model = client.model(),
        framing = ?client.framing(),
        "Generation client ready"
    );
    Ok(client)
}

fn require_key(value: Option<&str>, variable: &str) -> Result<String, GenerationError> {
    value
        .map(str::to_string)
        .ok_or_else(|| GenerationError::NotConfigured(format!("{variable} is not set")))
}

/// Slack added to the transport timeout so the per-call bound in [`SummaryGenerator`] fires first.
const HTTP_TIMEOUT_GRACE: Duration = Duration::from_secs(5);

pub(crate) fn http_client(timeout: Duration) -> Result<Client, GenerationError> {
    Client::builder()
        .user_agent("medbrief/generation")
        .timeout(timeout + HTTP_TIMEOUT_GRACE)
        .build()
        .map_err(|error| GenerationError::NotConfigured(format!("HTTP client: {error}")))
}

/// Send a JSON request and decode the JSON response, mapping transport and status failures.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    provider: &str,
    endpoint: &str,
) -> Result<T, GenerationError> {
    let response = request.send().await.map_err(|error| {
        if error.is_timeout() {
            GenerationError::Unavailable(format!("{provider} request to {endpoint} timed out"))
        } else {
            GenerationError::Unavailable(format!("failed to reach {provider} at {endpoint}: {error}"))
        }
    })?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(GenerationError::Unavailable(format!(
            "{provider} endpoint {endpoint} returned 404"
        )));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GenerationError::Rejected {
            status: status.as_u16(),
            body,
        });
    }

    response.json().await.map_err(|error| {
        GenerationError::InvalidResponse(format!("failed to decode {provider} response: {error}"))
    })
}

/// Reject blank completions; callers would otherwise store an empty summary or reply.
pub(crate) fn non_empty(text: String, provider: &str) -> Result<String, GenerationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(GenerationError::InvalidResponse(format!(
            "{provider} returned an empty completion"
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: GenerationProvider) -> Config {
        Config {
            generation_provider: provider,
            generation_model: provider.default_model().into(),
            generation_base_url: None,
            openai_api_key: None,
            anthropic_api_key: None,
            generation_timeout_secs: 5,
            summary_max_tokens: 2000,
            chat_max_tokens: 1500,
            generation_temperature: 0.7,
            max_documents_per_analysis: 10,
            server_port: None,
        }
    }

    #[test]
    fn hosted_providers_require_api_keys() {
        let error = get_generation_client(&config(GenerationProvider::OpenAI))
            .err()
            .expect("missing key");
        assert!(matches!(error, GenerationError::NotConfigured(ref message) if message.contains("OPENAI_API_KEY")));

        let mut anthropic = config(GenerationProvider::Anthropic);
        anthropic.anthropic_api_key = Some("sk-ant".into());
        let client = get_generation_client(&anthropic).expect("client");
        assert_eq!(client.provider(), "anthropic");
        assert_eq!(client.framing(), Framing::PrimingPair);
    }

    #[test]
    fn ollama_needs_no_key_and_uses_system_role() {
        let client = get_generation_client(&config(GenerationProvider::Ollama)).expect("client");
        assert_eq!(client.provider(), "ollama");
        assert_eq!(client.model(), "llama3.1");
        assert_eq!(client.framing(), Framing::SystemRole);
    }

    #[test]
    fn blank_completions_are_rejected() {
        assert!(non_empty("  \n".into(), "openai").is_err());
        assert_eq!(non_empty(" ok \n".into(), "openai").expect("text"), "ok");
    }
}
