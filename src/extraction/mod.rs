//! Document extraction: format dispatch, decoding, and per-document failure isolation.
//!
//! [`extract`] never returns an error. Read failures, decode failures, unsupported formats and
//! decoder panics all become [`ExtractionOutcome::Failure`] records. [`extract_all`] fans the
//! files out concurrently and joins on every one of them, preserving input order.

mod docx;
mod pdf;
mod text;
pub mod types;

pub use types::{
    ContentDigest, DocumentFormat, DocumentOutcome, DocumentRecord, ExtractionError,
    ExtractionOutcome, FormatMetadata, SourceFile, TextEncoding,
};

use futures_util::future::join_all;
use sha2::{Digest, Sha256};
use std::time::Instant;
use types::{DecodedDocument, extension_of};

/// Extract one file into a [`DocumentRecord`].
pub async fn extract(file: &SourceFile) -> DocumentRecord {
    let started = Instant::now();
    let filename = file.original_name.clone();
    let format = DocumentFormat::from_filename(&filename);

    let record = match format {
        DocumentFormat::Unsupported => {
            let extension = extension_of(&filename)
                .map(|ext| format!(".{ext}"))
                .unwrap_or_else(|| "(none)".to_string());
            DocumentRecord::failed(
                filename,
                format,
                None,
                ExtractionError::Unsupported(extension).to_string(),
            )
        }
        _ => match tokio::fs::read(&file.path).await {
            Ok(bytes) => decode_in_background(filename, format, bytes).await,
            Err(error) => DocumentRecord::failed(
                filename,
                format,
                None,
                ExtractionError::Read(error).to_string(),
            ),
        },
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match &record.outcome {
        ExtractionOutcome::Failure { reason } => tracing::warn!(
            file = %record.filename,
            format = ?record.format,
            reason = %reason,
            elapsed_ms,
            "Document extraction failed"
        ),
        outcome => tracing::info!(
            file = %record.filename,
            format = ?record.format,
            outcome = outcome.label(),
            chars = record.text.chars().count(),
            bytes = record.digest.as_ref().map(|digest| digest.byte_len),
            elapsed_ms,
            "Document extracted"
        ),
    }

    record
}

/// Extract every file concurrently. The result has one record per input, in input order.
pub async fn extract_all(files: &[SourceFile]) -> Vec<DocumentRecord> {
    join_all(files.iter().map(extract)).await
}

async fn decode_in_background(
    filename: String,
    format: DocumentFormat,
    bytes: Vec<u8>,
) -> DocumentRecord {
    let digest = digest_of(&bytes);
    let task = tokio::task::spawn_blocking(move || decode(format, &bytes));
    let result = match task.await {
        Ok(result) => result,
        Err(join_error) => Err(ExtractionError::Aborted(join_error.to_string())),
    };

    match result {
        Ok(decoded) => DocumentRecord::decoded(filename, format, decoded, digest),
        Err(error) => DocumentRecord::failed(filename, format, Some(digest), error.to_string()),
    }
}

fn decode(format: DocumentFormat, bytes: &[u8]) -> Result<DecodedDocument, ExtractionError> {
    match format {
        DocumentFormat::Pdf => pdf::decode(bytes),
        DocumentFormat::Docx => docx::decode(bytes),
        DocumentFormat::Text => text::decode(bytes),
        DocumentFormat::Unsupported => Err(ExtractionError::Unsupported("(unknown)".into())),
    }
}

fn digest_of(bytes: &[u8]) -> ContentDigest {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    ContentDigest {
        byte_len: bytes.len() as u64,
        sha256: hex::encode(hasher.finalize()),
    }
}
