use dashmap::DashMap;
use std::sync::Arc;

use super::{NotFound, RecordKind, current_timestamp_rfc3339};
use crate::extraction::{DocumentOutcome, DocumentRecord};

/// Completed analysis: the generated summary plus everything needed to chat about it later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRecord {
    /// Opaque identifier.
    pub id: String,
    /// Creation time (RFC 3339).
    pub timestamp: String,
    /// Number of files the request named.
    pub requested_count: usize,
    /// Number of files that contributed text.
    pub succeeded_count: usize,
    /// Generated summary.
    pub summary: String,
    /// Per-document outcomes, in request order, without text.
    pub documents: Vec<DocumentOutcome>,
    /// Aggregated context. Server-side only; never part of an outward response.
    pub context: String,
    /// Estimated token size of `context`.
    pub context_tokens: usize,
}

impl AnalysisRecord {
    /// Build a record from the extraction results of one request.
    ///
    /// Returns `None` when no record carries content, so an analysis can never exist without
    /// at least one successful document.
    pub fn new(
        id: String,
        records: &[DocumentRecord],
        summary: String,
        context: String,
        context_tokens: usize,
    ) -> Option<Self> {
        let succeeded_count = records.iter().filter(|record| record.has_content()).count();
        if succeeded_count == 0 {
            return None;
        }
        Some(Self {
            id,
            timestamp: current_timestamp_rfc3339(),
            requested_count: records.len(),
            succeeded_count,
            summary,
            documents: records.iter().map(DocumentRecord::to_outcome).collect(),
            context,
            context_tokens,
        })
    }
}

/// Keyed cache of completed analyses. Records are immutable; there is no update.
#[derive(Default)]
pub struct AnalysisStore {
    records: DashMap<String, Arc<AnalysisRecord>>,
}

impl AnalysisStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record under its id and return the shared handle.
    pub fn put(&self, record: AnalysisRecord) -> Arc<AnalysisRecord> {
        let record = Arc::new(record);
        self.records
            .insert(record.id.clone(), Arc::clone(&record));
        tracing::debug!(analysis_id = %record.id, stored = self.records.len(), "Analysis stored");
        record
    }

    /// Fetch a record by id.
    pub fn get(&self, id: &str) -> Result<Arc<AnalysisRecord>, NotFound> {
        self.records
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| NotFound {
                kind: RecordKind::Analysis,
                id: id.to_string(),
            })
    }

    /// Remove a record; `false` when the id was unknown.
    pub fn delete(&self, id: &str) -> bool {
        self.records.remove(id).is_some()
    }

    /// Number of stored analyses.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no analyses.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{DocumentFormat, ExtractionOutcome};
    use crate::store::generate_id;

    fn doc(filename: &str, text: &str, outcome: ExtractionOutcome) -> DocumentRecord {
        DocumentRecord {
            filename: filename.into(),
            format: DocumentFormat::from_filename(filename),
            text: text.into(),
            outcome,
            metadata: None,
            digest: None,
        }
    }

    fn sample_record() -> AnalysisRecord {
        let records = vec![
            doc("report.pdf", "BP 120/80", ExtractionOutcome::Success),
            doc("notes.txt", "", ExtractionOutcome::EmptyContent),
            doc(
                "scan.docx",
                "",
                ExtractionOutcome::Failure {
                    reason: "corrupt".into(),
                },
            ),
        ];
        AnalysisRecord::new(
            generate_id(),
            &records,
            "summary".into(),
            "context".into(),
            1,
        )
        .expect("one document succeeded")
    }

    #[test]
    fn record_counts_requested_and_succeeded() {
        let record = sample_record();
        assert_eq!(record.requested_count, 3);
        assert_eq!(record.succeeded_count, 1);
        assert_eq!(record.documents.len(), 3);
        assert!(record.documents[0].has_content);
        assert_eq!(record.documents[1].outcome, ExtractionOutcome::EmptyContent);
    }

    #[test]
    fn record_is_never_built_without_content() {
        let records = vec![doc("notes.txt", "", ExtractionOutcome::EmptyContent)];
        assert!(AnalysisRecord::new(generate_id(), &records, "s".into(), String::new(), 0).is_none());
    }

    #[test]
    fn put_get_delete_lifecycle() {
        let store = AnalysisStore::new();
        let record = sample_record();
        let id = record.id.clone();

        store.put(record);
        assert_eq!(store.get(&id).expect("stored").summary, "summary");

        assert!(store.delete(&id));
        assert!(!store.delete(&id));
        let missing = store.get(&id).expect_err("deleted");
        assert_eq!(missing.kind, RecordKind::Analysis);
        assert!(store.is_empty());
    }

    #[test]
    fn unknown_id_is_not_found() {
        let store = AnalysisStore::new();
        assert_eq!(
            store.get("never-created"),
            Err(NotFound {
                kind: RecordKind::Analysis,
                id: "never-created".into()
            })
        );
    }
}
