use super::types::{DecodedDocument, ExtractionError, FormatMetadata};

/// Decode a PDF page by page. Pages are joined with a newline so page boundaries survive.
pub(crate) fn decode(bytes: &[u8]) -> Result<DecodedDocument, ExtractionError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|error| ExtractionError::Pdf(error.to_string()))?;
    let page_count = pages.len();
    Ok(DecodedDocument {
        text: pages.join("\n"),
        metadata: FormatMetadata::Pdf { page_count },
    })
}
