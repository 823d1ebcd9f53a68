use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::{CompletionRequest, Framing, GenerationClient, GenerationError};

/// In-process client returning a fixed reply and recording every request.
pub(crate) struct ScriptedClient {
    pub(crate) framing: Framing,
    pub(crate) reply: Result<String, String>,
    pub(crate) delay: Duration,
    pub(crate) requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    pub(crate) fn replying(framing: Framing, reply: &str) -> Arc<Self> {
        Arc::new(Self {
            framing,
            reply: Ok(reply.into()),
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            framing: Framing::SystemRole,
            reply: Err(message.into()),
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(crate) async fn request_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    fn provider(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    fn framing(&self) -> Framing {
        self.framing
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, GenerationError> {
        self.requests.lock().await.push(request);
        tokio::time::sleep(self.delay).await;
        self.reply.clone().map_err(GenerationError::Unavailable)
    }
}
