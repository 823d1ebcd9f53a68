use std::sync::atomic::{AtomicU64, Ordering};

use crate::extraction::ExtractionOutcome;

/// Thread-safe counters describing analysis and chat activity.
#[derive(Default)]
pub struct ServiceMetrics {
    analyses_completed: AtomicU64,
    analyses_without_content: AtomicU64,
    documents_succeeded: AtomicU64,
    documents_empty: AtomicU64,
    documents_failed: AtomicU64,
    chat_turns: AtomicU64,
    generation_failures: AtomicU64,
}

impl ServiceMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one document extraction.
    pub fn record_extraction(&self, outcome: &ExtractionOutcome) {
        let counter = match outcome {
            ExtractionOutcome::Success => &self.documents_succeeded,
            ExtractionOutcome::EmptyContent => &self.documents_empty,
            ExtractionOutcome::Failure { .. } => &self.documents_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an analysis that produced a stored record.
    pub fn record_analysis(&self) {
        self.analyses_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an analysis rejected because no document yielded content.
    pub fn record_empty_aggregate(&self) {
        self.analyses_without_content
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Record a committed chat turn.
    pub fn record_chat_turn(&self) {
        self.chat_turns.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed or timed-out generation call.
    pub fn record_generation_failure(&self) {
        self.generation_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            analyses_completed: self.analyses_completed.load(Ordering::Relaxed),
            analyses_without_content: self.analyses_without_content.load(Ordering::Relaxed),
            documents_succeeded: self.documents_succeeded.load(Ordering::Relaxed),
            documents_empty: self.documents_empty.load(Ordering::Relaxed),
            documents_failed: self.documents_failed.load(Ordering::Relaxed),
            chat_turns: self.chat_turns.load(Ordering::Relaxed),
            generation_failures: self.generation_failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of service counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Analyses stored since startup.
    pub analyses_completed: u64,
    /// Analyses rejected because every document came back empty or failed.
    pub analyses_without_content: u64,
    /// Documents whose extraction produced text.
    pub documents_succeeded: u64,
    /// Documents that decoded cleanly but held no text.
    pub documents_empty: u64,
    /// Documents whose extraction failed.
    pub documents_failed: u64,
    /// Chat turns appended across all conversations.
    pub chat_turns: u64,
    /// Generation calls that errored or timed out.
    pub generation_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_extraction_outcomes_by_kind() {
        let metrics = ServiceMetrics::new();
        metrics.record_extraction(&ExtractionOutcome::Success);
        metrics.record_extraction(&ExtractionOutcome::Success);
        metrics.record_extraction(&ExtractionOutcome::EmptyContent);
        metrics.record_extraction(&ExtractionOutcome::Failure {
            reason: "corrupt".into(),
        });

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_succeeded, 2);
        assert_eq!(snapshot.documents_empty, 1);
        assert_eq!(snapshot.documents_failed, 1);
    }

    #[test]
    fn snapshot_starts_at_zero() {
        let metrics = ServiceMetrics::new();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }
}
