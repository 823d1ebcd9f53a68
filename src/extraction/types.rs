//! Records and error definitions shared by the format decoders.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised inside a decoder. These never leave the extraction layer: they are folded
/// into [`ExtractionOutcome::Failure`] with their display text as the reason.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Declared extension has no decoder.
    #[error("Unsupported file type: {0}")]
    Unsupported(String),
    /// Bytes could not be read from the stored file.
    #[error("Failed to read file: {0}")]
    Read(#[from] std::io::Error),
    /// PDF structure could not be decoded.
    #[error("Failed to parse PDF: {0}")]
    Pdf(String),
    /// DOCX container or document part could not be decoded.
    #[error("Failed to parse DOCX: {0}")]
    Docx(String),
    /// File is an OLE2 compound document (pre-2007 Word).
    #[error("Failed to parse DOCX: legacy binary Word documents are not supported, re-save as .docx")]
    LegacyWord,
    /// Decoder task aborted before producing a result.
    #[error("Decoder aborted: {0}")]
    Aborted(String),
}

/// One uploaded file handed over by the storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
    /// Location of the stored bytes.
    pub path: PathBuf,
    /// Name the client uploaded the file under; drives format dispatch.
    pub original_name: String,
}

impl SourceFile {
    /// Pair a stored path with its declared name.
    pub fn new(path: impl Into<PathBuf>, original_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            original_name: original_name.into(),
        }
    }
}

/// Format tag resolved from the declared file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// Portable Document Format.
    Pdf,
    /// Office Open XML word processing document (and legacy `.doc`).
    Docx,
    /// Plain text.
    Text,
    /// Anything else; never read.
    Unsupported,
}

impl DocumentFormat {
    /// Resolve the format from a file name's extension, ignoring case.
    pub fn from_filename(name: &str) -> Self {
        match extension_of(name).as_deref() {
            Some("pdf") => Self::Pdf,
            Some("docx") | Some("doc") => Self::Docx,
            Some("txt") => Self::Text,
            _ => Self::Unsupported,
        }
    }
}

/// Lowercased extension of `name`, if any.
pub(crate) fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
}

/// Classification of one extraction attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ExtractionOutcome {
    /// Decoding succeeded and produced non-blank text.
    Success,
    /// Decoding succeeded but the trimmed text is empty.
    EmptyContent,
    /// Decoding failed or the format is unsupported.
    Failure {
        /// Human-readable explanation.
        reason: String,
    },
}

impl ExtractionOutcome {
    /// Short label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::EmptyContent => "empty",
            Self::Failure { .. } => "failure",
        }
    }
}

/// Encoding observed by the plain-text decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TextEncoding {
    /// Valid UTF-8.
    #[serde(rename = "utf-8")]
    Utf8,
    /// Valid UTF-8 preceded by a byte order mark (stripped).
    #[serde(rename = "utf-8-bom")]
    Utf8WithBom,
    /// Invalid sequences were replaced with U+FFFD.
    #[serde(rename = "utf-8 (lossy)")]
    Utf8Lossy,
}

/// Structural details reported by the decoder that handled the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FormatMetadata {
    /// PDF page count.
    #[serde(rename_all = "camelCase")]
    Pdf {
        /// Number of pages in the document.
        page_count: usize,
    },
    /// Non-fatal issues met while flattening the DOCX body.
    Docx {
        /// Decode warnings, deduplicated, in first-seen order.
        warnings: Vec<String>,
    },
    /// Character encoding of a plain-text file.
    Text {
        /// Detected encoding.
        encoding: TextEncoding,
    },
}

/// Text plus metadata produced by a successful decode.
#[derive(Debug, Clone)]
pub(crate) struct DecodedDocument {
    pub(crate) text: String,
    pub(crate) metadata: FormatMetadata,
}

/// Size and digest of the bytes that were read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDigest {
    /// Number of bytes read.
    pub byte_len: u64,
    /// Hex-encoded SHA-256 of the bytes.
    pub sha256: String,
}

/// Normalized result of extracting one document. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    /// Declared file name.
    pub filename: String,
    /// Format the file was dispatched as.
    pub format: DocumentFormat,
    /// Extracted text; empty unless the decode succeeded.
    pub text: String,
    /// Classification of the attempt.
    pub outcome: ExtractionOutcome,
    /// Decoder metadata, present whenever decoding succeeded.
    pub metadata: Option<FormatMetadata>,
    /// Digest of the bytes, present whenever they could be read.
    pub digest: Option<ContentDigest>,
}

impl DocumentRecord {
    pub(crate) fn decoded(
        filename: String,
        format: DocumentFormat,
        decoded: DecodedDocument,
        digest: ContentDigest,
    ) -> Self {
        let outcome = if decoded.text.trim().is_empty() {
            ExtractionOutcome::EmptyContent
        } else {
            ExtractionOutcome::Success
        };
        Self {
            filename,
            format,
            text: decoded.text,
            outcome,
            metadata: Some(decoded.metadata),
            digest: Some(digest),
        }
    }

    pub(crate) fn failed(
        filename: String,
        format: DocumentFormat,
        digest: Option<ContentDigest>,
        reason: String,
    ) -> Self {
        Self {
            filename,
            format,
            text: String::new(),
            outcome: ExtractionOutcome::Failure { reason },
            metadata: None,
            digest,
        }
    }

    /// Whether this record contributes to the aggregated context.
    pub fn has_content(&self) -> bool {
        matches!(self.outcome, ExtractionOutcome::Success) && !self.text.trim().is_empty()
    }

    /// Outcome view without the extracted text.
    pub fn to_outcome(&self) -> DocumentOutcome {
        DocumentOutcome {
            filename: self.filename.clone(),
            format: self.format,
            has_content: self.has_content(),
            outcome: self.outcome.clone(),
            metadata: self.metadata.clone(),
            digest: self.digest.clone(),
        }
    }
}

/// Per-document entry kept on an analysis: everything but the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentOutcome {
    /// Declared file name.
    pub filename: String,
    /// Format the file was dispatched as.
    pub format: DocumentFormat,
    /// Whether the document contributed text to the context.
    pub has_content: bool,
    /// Classification of the attempt.
    pub outcome: ExtractionOutcome,
    /// Decoder metadata, when decoding succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<FormatMetadata>,
    /// Byte size and digest, when the file could be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<ContentDigest>,
}
