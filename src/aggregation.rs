//! Combine extraction records into the single grounding context handed to generation.

use crate::extraction::DocumentRecord;

/// Boundary header written before each document's text.
pub fn boundary_header(filename: &str) -> String {
    format!("=== Document: {filename} ===")
}

/// Number of records that will contribute a block to [`combine`].
pub fn qualifying_count(records: &[DocumentRecord]) -> usize {
    records.iter().filter(|record| record.has_content()).count()
}

/// Concatenate every record with content, in input order, each behind a boundary header.
///
/// Returns an empty string when nothing qualifies; callers must check [`qualifying_count`]
/// before handing the result to a generator.
pub fn combine(records: &[DocumentRecord]) -> String {
    records
        .iter()
        .filter(|record| record.has_content())
        .map(|record| format!("\n{}\n{}\n", boundary_header(&record.filename), record.text))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{DocumentFormat, ExtractionOutcome};

    fn record(filename: &str, text: &str, outcome: ExtractionOutcome) -> DocumentRecord {
        DocumentRecord {
            filename: filename.into(),
            format: DocumentFormat::from_filename(filename),
            text: text.into(),
            outcome,
            metadata: None,
            digest: None,
        }
    }

    #[test]
    fn keeps_only_successful_records_in_input_order() {
        let records = vec![
            record("report.pdf", "BP 120/80", ExtractionOutcome::Success),
            record("notes.txt", "", ExtractionOutcome::EmptyContent),
            record(
                "scan.docx",
                "",
                ExtractionOutcome::Failure {
                    reason: "corrupt".into(),
                },
            ),
            record("labs.txt", "LDL 3.1 mmol/L", ExtractionOutcome::Success),
        ];

        let context = combine(&records);

        assert_eq!(qualifying_count(&records), 2);
        assert_eq!(context.matches("=== Document: ").count(), 2);
        let report = context.find(&boundary_header("report.pdf")).expect("report block");
        let labs = context.find(&boundary_header("labs.txt")).expect("labs block");
        assert!(report < labs);
        assert!(context.contains("BP 120/80"));
        assert!(context.contains("LDL 3.1 mmol/L"));
        assert!(!context.contains("notes.txt"));
        assert!(!context.contains("scan.docx"));
    }

    #[test]
    fn text_is_emitted_verbatim_after_its_header() {
        let records = vec![record(
            "report.pdf",
            "  Line one\n\tLine two  ",
            ExtractionOutcome::Success,
        )];
        assert_eq!(
            combine(&records),
            "\n=== Document: report.pdf ===\n  Line one\n\tLine two  \n"
        );
    }

    #[test]
    fn nothing_qualifying_yields_empty_string() {
        let records = vec![
            record("notes.txt", "   ", ExtractionOutcome::EmptyContent),
            record(
                "scan.docx",
                "",
                ExtractionOutcome::Failure {
                    reason: "corrupt".into(),
                },
            ),
        ];
        assert_eq!(qualifying_count(&records), 0);
        assert!(combine(&records).is_empty());
        assert!(combine(&[]).is_empty());
    }
}
