use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{CompletionRequest, Framing, GenerationClient, GenerationError, non_empty, send_json};

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";

/// Chat completions client.
pub(crate) struct OpenAiClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub(crate) fn new(
        http: Client,
        base_url: Option<String>,
        api_key: String,
        model: String,
    ) -> Self {
        Self {
            http,
            base_url: base_url.unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string()),
            api_key,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl GenerationClient for OpenAiClient {
    fn provider(&self) -> &'static str {
        "openai"
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
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });

        let body: ChatCompletionResponse = send_json(
            self.http
                .post(&endpoint)
                .bearer_auth(&self.api_key)
                .json(&payload),
            self.provider(),
            &endpoint,
        )
        .await?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                GenerationError::InvalidResponse("OpenAI response contained no choices".into())
            })?;
        non_empty(content, self.provider())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::ChatMessage;
    use httpmock::{Method::POST, MockServer};

    fn client(server: &MockServer) -> OpenAiClient {
        OpenAiClient::new(
            Client::new(),
            Some(server.base_url()),
            "sk-test".into(),
            "gpt-4-turbo".into(),
        )
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            messages: vec![ChatMessage::system("framing"), ChatMessage::user("hello")],
            max_tokens: 1500,
            temperature: 0.7,
        }
    }

    #[tokio::test]
    async fn sends_system_role_and_returns_first_choice() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer sk-test")
                    .json_body_partial(
                        r#"{"model":"gpt-4-turbo","max_tokens":1500,"messages":[{"role":"system","content":"framing"},{"role":"user","content":"hello"}]}"#,
                    );
                then.status(200).json_body(json!({
                    "choices": [{ "message": { "role": "assistant", "content": " Hi there \n" } }]
                }));
            })
            .await;

        let text = client(&server).complete(request()).await.expect("completion");

        mock.assert_async().await;
        assert_eq!(text, "Hi there");
    }

    #[tokio::test]
    async fn error_status_is_rejected_with_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(429).body("rate limited");
            })
            .await;

        let error = client(&server).complete(request()).await.expect_err("429");

        assert!(
            matches!(error, GenerationError::Rejected { status: 429, ref body } if body == "rate limited"),
            "{error:?}"
        );
    }

    #[tokio::test]
    async fn missing_choices_is_invalid_response() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200).json_body(json!({ "choices": [] }));
            })
            .await;

        let error = client(&server).complete(request()).await.expect_err("empty");
        assert!(matches!(error, GenerationError::InvalidResponse(_)));
    }
}
