//! Message-sequence construction for stateless generation calls.
//!
//! Providers keep no memory between calls, so every chat request replays the whole conversation:
//! framing first, then each prior turn as a user/assistant pair, then the new message. Payload
//! size grows linearly with the number of turns.

use serde::Serialize;

use super::prompts::{CHAT_ACKNOWLEDGEMENT, SUMMARY_SYSTEM_PROMPT, chat_framing, summary_prompt};
use crate::store::Turn;

/// Speaker of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Standing instructions.
    System,
    /// End-user input.
    User,
    /// Model output.
    Assistant,
}

/// One message in a completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    /// Speaker.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Build a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Build a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Build an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// How the framing block is injected for a given provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Provider accepts a native system message.
    SystemRole,
    /// Provider gets the framing as a user message followed by a canned acknowledgement.
    PrimingPair,
}

/// Builds the ordered message sequence for summary and chat calls.
#[derive(Debug, Clone, Copy)]
pub struct ConversationContextBuilder {
    framing: Framing,
}

impl ConversationContextBuilder {
    /// Builder using the given framing variant.
    pub fn new(framing: Framing) -> Self {
        Self { framing }
    }

    /// Framing variant in use.
    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Messages for one chat call: framing, replayed history, then `new_message` last.
    pub fn build_request(
        &self,
        system_context: &str,
        turns: &[Turn],
        new_message: &str,
    ) -> Vec<ChatMessage> {
        let framing = chat_framing(system_context);
        let mut messages = Vec::with_capacity(turns.len() * 2 + 3);
        match self.framing {
            Framing::SystemRole => messages.push(ChatMessage::system(framing)),
            Framing::PrimingPair => {
                messages.push(ChatMessage::user(framing));
                messages.push(ChatMessage::assistant(CHAT_ACKNOWLEDGEMENT));
            }
        }
        for turn in turns {
            messages.push(ChatMessage::user(turn.user_message.clone()));
            messages.push(ChatMessage::assistant(turn.assistant_response.clone()));
        }
        messages.push(ChatMessage::user(new_message));
        messages
    }

    /// Messages for the summary call over an aggregated context.
    pub fn build_summary_request(&self, context: &str) -> Vec<ChatMessage> {
        let prompt = ChatMessage::user(summary_prompt(context));
        match self.framing {
            Framing::SystemRole => vec![ChatMessage::system(SUMMARY_SYSTEM_PROMPT), prompt],
            Framing::PrimingPair => vec![prompt],
        }
    }

    /// Number of leading messages that belong to the framing block.
    pub fn framing_len(&self) -> usize {
        match self.framing {
            Framing::SystemRole => 1,
            Framing::PrimingPair => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> Vec<Turn> {
        vec![Turn::new("u1", "a1"), Turn::new("u2", "a2")]
    }

    #[test]
    fn replay_follows_framing_in_chronological_order() {
        for framing in [Framing::SystemRole, Framing::PrimingPair] {
            let builder = ConversationContextBuilder::new(framing);
            let messages = builder.build_request("BP 120/80", &history(), "u3");

            let replay: Vec<_> = messages[builder.framing_len()..]
                .iter()
                .map(|message| (message.role, message.content.as_str()))
                .collect();
            assert_eq!(
                replay,
                [
                    (Role::User, "u1"),
                    (Role::Assistant, "a1"),
                    (Role::User, "u2"),
                    (Role::Assistant, "a2"),
                    (Role::User, "u3"),
                ],
                "{framing:?}"
            );
        }
    }

    #[test]
    fn system_role_framing_carries_context() {
        let builder = ConversationContextBuilder::new(Framing::SystemRole);
        let messages = builder.build_request("BP 120/80", &[], "hello");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("BP 120/80"));
    }

    #[test]
    fn priming_pair_never_emits_system_messages() {
        let builder = ConversationContextBuilder::new(Framing::PrimingPair);
        let messages = builder.build_request("BP 120/80", &history(), "u3");

        assert!(messages.iter().all(|message| message.role != Role::System));
        assert!(messages[0].content.contains("BP 120/80"));
        assert_eq!(messages[1].content, CHAT_ACKNOWLEDGEMENT);
    }

    #[test]
    fn summary_request_shape_depends_on_framing() {
        let system = ConversationContextBuilder::new(Framing::SystemRole).build_summary_request("ctx");
        assert_eq!(system.len(), 2);
        assert_eq!(system[0].role, Role::System);
        assert!(system[1].content.contains("ctx"));

        let primed = ConversationContextBuilder::new(Framing::PrimingPair).build_summary_request("ctx");
        assert_eq!(primed.len(), 1);
        assert_eq!(primed[0].role, Role::User);
    }
}
