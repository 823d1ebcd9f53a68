//! Token-size estimates for prompts and contexts.
//!
//! Counts are diagnostics only: they are logged per call and stored on each analysis, never
//! used to truncate. `tiktoken-rs` is preferred; models it does not know (Anthropic, most Ollama
//! tags) fall back to `cl100k_base`, and a whitespace counter covers the case where no encoding
//! can be loaded at all.

use anyhow::Error as TokenizerError;
use std::fmt;
use std::sync::Arc;
use tiktoken_rs::{CoreBPE, cl100k_base, get_bpe_from_model, o200k_base, p50k_base, r50k_base};

use super::context::ChatMessage;

type TokenCounter = Arc<dyn Fn(&str) -> usize + Send + Sync>;

/// Per-message overhead charged on top of content tokens.
const MESSAGE_OVERHEAD_TOKENS: usize = 4;

/// Estimates token counts for one model.
#[derive(Clone)]
pub struct TokenEstimator {
    counter: TokenCounter,
    tokenizer: &'static str,
}

impl fmt::Debug for TokenEstimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenEstimator")
            .field("tokenizer", &self.tokenizer)
            .finish()
    }
}

impl TokenEstimator {
    /// Build an estimator for `model`, degrading to whitespace counting when no BPE loads.
    pub fn for_model(model: &str) -> Self {
        match resolve_encoding(model.trim()) {
            Ok(encoding) => {
                let encoding = Arc::new(encoding);
                Self {
                    counter: Arc::new(move |segment: &str| encoding.encode_ordinary(segment).len()),
                    tokenizer: "tiktoken",
                }
            }
            Err(error) => {
                tracing::warn!(
                    model,
                    error = %error,
                    "Tokenizer unavailable; falling back to whitespace counter"
                );
                Self::whitespace()
            }
        }
    }

    /// Estimator that counts whitespace-separated words.
    pub fn whitespace() -> Self {
        Self {
            counter: Arc::new(|segment: &str| segment.split_whitespace().count()),
            tokenizer: "whitespace",
        }
    }

    /// Name of the counting strategy, for logs.
    pub fn tokenizer(&self) -> &'static str {
        self.tokenizer
    }

    /// Estimated tokens in `text`.
    pub fn count(&self, text: &str) -> usize {
        (self.counter)(text)
    }

    /// Estimated tokens for a whole message sequence.
    pub fn count_messages(&self, messages: &[ChatMessage]) -> usize {
        messages
            .iter()
            .map(|message| self.count(&message.content) + MESSAGE_OVERHEAD_TOKENS)
            .sum()
    }
}

fn resolve_encoding(model: &str) -> Result<CoreBPE, TokenizerError> {
    if model.is_empty() {
        return cl100k_base();
    }
    match get_bpe_from_model(model) {
        Ok(encoding) => Ok(encoding),
        Err(model_err) => {
            tracing::debug!(
                model,
                error = %model_err,
                "Tokenizer model lookup failed; trying encoding name"
            );
            match model {
                "o200k_base" => o200k_base(),
                "p50k_base" => p50k_base(),
                "r50k_base" | "gpt2" => r50k_base(),
                _ => cl100k_base(),
            }
        }
    }
}
