//! Append-only conversation histories keyed by conversation id.
//!
//! Each conversation carries a send lock and a separate turn list. Sends on one id queue behind
//! the send lock for a whole generation round trip, while history reads only take the short
//! read guard on the turn list. Different ids never contend. The map itself is only touched
//! briefly to look up or publish the per-conversation handle; no map guard is ever held across
//! an `.await`.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{NotFound, RecordKind, current_timestamp_rfc3339, generate_id};

/// One user message paired with the assistant's reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    /// Message sent by the user.
    pub user_message: String,
    /// Generated reply.
    pub assistant_response: String,
    /// Time the turn was recorded (RFC 3339).
    pub timestamp: String,
}

impl Turn {
    /// Build a turn stamped with the current time.
    pub fn new(user_message: impl Into<String>, assistant_response: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            assistant_response: assistant_response.into(),
            timestamp: current_timestamp_rfc3339(),
        }
    }
}

#[derive(Default)]
struct Conversation {
    send: Arc<Mutex<()>>,
    turns: RwLock<Vec<Turn>>,
}

impl Conversation {
    fn snapshot(&self) -> Vec<Turn> {
        self.turns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, turn: Turn) -> usize {
        let mut turns = self.turns.write().unwrap_or_else(PoisonError::into_inner);
        turns.push(turn);
        turns.len()
    }
}

/// Keyed cache of conversation histories.
#[derive(Default)]
pub struct ConversationStore {
    conversations: DashMap<String, Arc<Conversation>>,
}

impl ConversationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lookup(&self, id: &str) -> Option<Arc<Conversation>> {
        self.conversations
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Resolve a conversation for a new message.
    ///
    /// A known id returns a snapshot of its turns. An omitted or unknown id yields a freshly
    /// allocated id with no turns; nothing is stored until a turn is appended.
    pub fn get_or_create(&self, id: Option<&str>) -> (String, Vec<Turn>) {
        match id.and_then(|id| self.lookup(id).map(|conversation| (id, conversation))) {
            Some((id, conversation)) => (id.to_string(), conversation.snapshot()),
            None => (generate_id(), Vec::new()),
        }
    }

    /// Open an exclusive session on a conversation.
    ///
    /// The session holds the conversation's send lock until it is committed or dropped, so a
    /// whole read-history/generate/append cycle is serialized against other sends on the same
    /// id. Readers are not blocked. Id resolution follows [`ConversationStore::get_or_create`].
    pub async fn begin(&self, id: Option<&str>) -> ConversationSession<'_> {
        let existing = id.and_then(|id| {
            self.lookup(id)
                .map(|conversation| (id.to_string(), conversation))
        });
        let (id, conversation, is_new) = match existing {
            Some((id, conversation)) => (id, conversation, false),
            None => (generate_id(), Arc::default(), true),
        };
        let guard = Arc::clone(&conversation.send).lock_owned().await;
        let history = conversation.snapshot();
        ConversationSession {
            store: self,
            id,
            conversation,
            history,
            _guard: guard,
            is_new,
        }
    }

    /// Append one turn to a conversation, creating it if needed. Returns the new turn count.
    pub async fn append_turn(&self, id: &str, turn: Turn) -> usize {
        let conversation = Arc::clone(&self.conversations.entry(id.to_string()).or_default());
        let _guard = conversation.send.lock().await;
        conversation.push(turn)
    }

    /// Snapshot of a conversation's turns. Never waits on an in-flight send.
    pub fn get(&self, id: &str) -> Result<Vec<Turn>, NotFound> {
        self.lookup(id)
            .map(|conversation| conversation.snapshot())
            .ok_or_else(|| NotFound {
                kind: RecordKind::Conversation,
                id: id.to_string(),
            })
    }

    /// Remove one conversation; `false` when the id was unknown.
    pub fn delete_one(&self, id: &str) -> bool {
        self.conversations.remove(id).is_some()
    }

    /// Remove every conversation and return how many were removed.
    pub fn delete_all(&self) -> usize {
        let ids: Vec<String> = self
            .conversations
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        ids.iter()
            .filter(|id| self.conversations.remove(id.as_str()).is_some())
            .count()
    }

    /// Number of stored conversations.
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    /// Whether no conversation is stored.
    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}

/// Exclusive handle on one conversation, obtained from [`ConversationStore::begin`].
pub struct ConversationSession<'a> {
    store: &'a ConversationStore,
    id: String,
    conversation: Arc<Conversation>,
    history: Vec<Turn>,
    _guard: OwnedMutexGuard<()>,
    is_new: bool,
}

impl ConversationSession<'_> {
    /// Conversation id this session writes to.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Turns recorded before this session, oldest first.
    pub fn turns(&self) -> &[Turn] {
        &self.history
    }

    /// Whether the id was allocated by this session.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Append `turn`, publish a newly allocated conversation, and release the send lock.
    /// Returns the turn count after the append.
    pub fn commit(self, turn: Turn) -> usize {
        let count = self.conversation.push(turn);
        if self.is_new {
            self.store
                .conversations
                .insert(self.id.clone(), Arc::clone(&self.conversation));
        }
        count
    }
}
