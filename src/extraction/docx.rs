//! Flatten the body of an Office Open XML word processing document into plain text.
//!
//! Only `word/document.xml` is read. Runs of `<w:t>` text are concatenated, `<w:tab/>` becomes a
//! tab, `<w:br/>`/`<w:cr/>` a line break, and every closed paragraph ends a line. Drawings and
//! unknown entities do not fail the decode; they are reported as warnings instead.

use regex::{Captures, Regex};
use std::io::{Cursor, Read};
use std::sync::LazyLock;
use zip::ZipArchive;

use super::types::{DecodedDocument, ExtractionError, FormatMetadata};

const DOCUMENT_PART: &str = "word/document.xml";
const OLE2_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(/?)([A-Za-z][\w:.-]*)[^>]*?(/?)>|([^<]+)").expect("valid token regex")
});
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#x[0-9A-Fa-f]+|#[0-9]+|[A-Za-z][A-Za-z0-9]*);").expect("valid entity regex")
});

pub(crate) fn decode(bytes: &[u8]) -> Result<DecodedDocument, ExtractionError> {
    if bytes.starts_with(&OLE2_SIGNATURE) {
        return Err(ExtractionError::LegacyWord);
    }

    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|error| ExtractionError::Docx(format!("not a DOCX archive ({error})")))?;
    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|error| ExtractionError::Docx(format!("missing {DOCUMENT_PART} ({error})")))?
        .read_to_string(&mut xml)
        .map_err(|error| ExtractionError::Docx(format!("unreadable {DOCUMENT_PART} ({error})")))?;

    let (text, warnings) = flatten_document_xml(&xml);
    Ok(DecodedDocument {
        text,
        metadata: FormatMetadata::Docx { warnings },
    })
}

fn flatten_document_xml(xml: &str) -> (String, Vec<String>) {
    let mut text = String::new();
    let mut warnings = Vec::new();
    let mut in_run_text = false;

    for token in TOKEN_RE.captures_iter(xml) {
        if let Some(content) = token.get(4) {
            if in_run_text {
                text.push_str(&unescape(content.as_str(), &mut warnings));
            }
            continue;
        }

        let closing = !token[1].is_empty();
        let self_closing = !token[3].is_empty();
        match (&token[2], closing) {
            ("w:t", false) => in_run_text = !self_closing,
            ("w:t", true) => in_run_text = false,
            ("w:tab", false) => text.push('\t'),
            ("w:br" | "w:cr", false) => text.push('\n'),
            ("w:p", true) => text.push('\n'),
            ("w:drawing" | "w:pict" | "w:object", false) => {
                push_warning(&mut warnings, "embedded image or object skipped".to_string());
            }
            _ => {}
        }
    }

    (text.trim_end().to_string(), warnings)
}

fn unescape(raw: &str, warnings: &mut Vec<String>) -> String {
    ENTITY_RE
        .replace_all(raw, |caps: &Captures| {
            let entity = &caps[1];
            let resolved = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .or_else(|| entity.strip_prefix('#').map(str::parse::<u32>))
                    .and_then(Result::ok)
                    .and_then(char::from_u32),
            };
            match resolved {
                Some(ch) => ch.to_string(),
                None => {
                    push_warning(warnings, format!("unrecognized XML entity &{entity};"));
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}

fn push_warning(warnings: &mut Vec<String>, warning: String) {
    if !warnings.contains(&warning) {
        warnings.push(warning);
    }
}
