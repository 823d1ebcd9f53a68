use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{CompletionRequest, Framing, GenerationClient, GenerationError, non_empty, send_json};

const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Local Ollama runtime reached through `/api/chat`.
pub(crate) struct OllamaClient {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub(crate) fn new(http: Client, base_url: Option<String>, model: String) -> Self {
        Self {
            http,
            base_url: base_url.unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
    done: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    content: String,
}

#[async_trait]
impl GenerationClient for OllamaClient {
    fn provider(&self) -> &'static str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn framing(&self) -> Framing {
        Framing::SystemRole
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, GenerationError> {
        let endpoint = self.endpoint();
        let payload = json!({
            "model": self.model,
            "messages": request.messages,
            "stream": false,
            "options": {
                "temperature": request.temperature,
                "num_predict": request.max_tokens,
            }
        });

        let body: OllamaChatResponse = send_json(
            self.http.post(&endpoint).json(&payload),
            self.provider(),
            &endpoint,
        )
        .await?;

        if !body.done {
            return Err(GenerationError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }
        non_empty(body.message.content, self.provider())
    }
}
