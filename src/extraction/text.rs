use super::types::{DecodedDocument, ExtractionError, FormatMetadata, TextEncoding};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Decode plain text as UTF-8. Invalid sequences are replaced rather than rejected and the
/// replacement is reported through the encoding.
pub(crate) fn decode(bytes: &[u8]) -> Result<DecodedDocument, ExtractionError> {
    let (body, had_bom) = match bytes.strip_prefix(UTF8_BOM) {
        Some(rest) => (rest, true),
        None => (bytes, false),
    };

    let (text, encoding) = match std::str::from_utf8(body) {
        Ok(text) if had_bom => (text.to_string(), TextEncoding::Utf8WithBom),
        Ok(text) => (text.to_string(), TextEncoding::Utf8),
        Err(_) => (
            String::from_utf8_lossy(body).into_owned(),
            TextEncoding::Utf8Lossy,
        ),
    };

    Ok(DecodedDocument {
        text,
        metadata: FormatMetadata::Text { encoding },
    })
}
