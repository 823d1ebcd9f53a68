use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{
    ChatMessage, CompletionRequest, Framing, GenerationClient, GenerationError, Role, non_empty,
    send_json,
};

const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Messages API client. Framing arrives as a user/assistant priming pair.
pub(crate) struct AnthropicClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl AnthropicClient {
    pub(crate) fn new(
        http: Client,
        base_url: Option<String>,
        api_key: String,
        model: String,
    ) -> Self {
        Self {
            http,
            base_url: base_url.unwrap_or_else(|| DEFAULT_ANTHROPIC_URL.to_string()),
            api_key,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }
}

/// Split messages into the top-level `system` string and the conversational list, which the
/// Messages API only accepts with `user`/`assistant` roles.
fn to_payload_parts(messages: &[ChatMessage]) -> (Option<String>, Vec<Value>) {
    let system: Vec<&str> = messages
        .iter()
        .filter(|message| message.role == Role::System)
        .map(|message| message.content.as_str())
        .collect();
    let conversation = messages
        .iter()
        .filter(|message| message.role != Role::System)
        .map(|message| json!({ "role": message.role, "content": message.content }))
        .collect();
    let system = (!system.is_empty()).then(|| system.join("\n\n"));
    (system, conversation)
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl GenerationClient for AnthropicClient {
    fn provider(&self) -> &'static str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn framing(&self) -> Framing {
        Framing::PrimingPair
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, GenerationError> {
        let endpoint = self.endpoint();
        let (system, messages) = to_payload_parts(&request.messages);
        let mut payload = json!({
            "model": self.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "messages": messages,
        });
        if let Some(system) = system {
            payload["system"] = Value::String(system);
        }

        let body: MessagesResponse = send_json(
            self.http
                .post(&endpoint)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&payload),
            self.provider(),
            &endpoint,
        )
        .await?;

        let text: Vec<String> = body
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();
        if text.is_empty() {
            return Err(GenerationError::InvalidResponse(
                "Anthropic response contained no text blocks".into(),
            ));
        }
        non_empty(text.join(""), self.provider())
    }
}
