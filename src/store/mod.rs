//! In-memory stores for completed analyses and conversations.
//!
//! Both stores are plain values constructed once at startup and shared by handle. Neither evicts:
//! growth is bounded only by process lifetime.

mod analysis;
mod conversation;

pub use analysis::{AnalysisRecord, AnalysisStore};
pub use conversation::{ConversationSession, ConversationStore, Turn};

use std::fmt;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// Kind of record a lookup targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Stored analysis.
    Analysis,
    /// Conversation history.
    Conversation,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Analysis => f.write_str("Analysis"),
            Self::Conversation => f.write_str("Conversation"),
        }
    }
}

/// Lookup of an id that was never stored or has been deleted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} not found: {id}")]
pub struct NotFound {
    /// Which store was searched.
    pub kind: RecordKind,
    /// Identifier that missed.
    pub id: String,
}

/// Allocate a fresh record identifier.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current timestamp formatted as RFC 3339.
pub fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_ids_do_not_collide() {
        let ids: HashSet<String> = (0..1_000).map(|_| generate_id()).collect();
        assert_eq!(ids.len(), 1_000);
    }

    #[test]
    fn timestamp_is_rfc3339_like() {
        let ts = current_timestamp_rfc3339();
        assert!(ts.contains('T') && ts.ends_with('Z'));
    }

    #[test]
    fn not_found_names_kind_and_id() {
        let error = NotFound {
            kind: RecordKind::Conversation,
            id: "abc".into(),
        };
        assert_eq!(error.to_string(), "Conversation not found: abc");
    }
}
