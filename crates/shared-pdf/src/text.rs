//! PDF probing and text extraction
//!
//! `probe` answers "is this a PDF at all" using lopdf's parser, which is
//! strict about structure. `extract_text` pulls plain text with pdf-extract.
//! Both work on in-memory bytes; nothing touches the filesystem.

use lopdf::Document;
use pdf_extract::extract_text_from_mem;

use crate::error::PdfError;

/// Basic facts about a parsed PDF
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfInfo {
    pub page_count: usize,
    pub version: String,
}

/// Parse the document structure without extracting text.
///
/// # Errors
/// - `PdfError::Empty` for zero-length input
/// - `PdfError::NotPdf` when lopdf cannot parse the bytes
/// - `PdfError::PasswordProtected` when the trailer carries an `/Encrypt` entry
pub fn probe(bytes: &[u8]) -> Result<PdfInfo, PdfError> {
    if bytes.is_empty() {
        return Err(PdfError::Empty);
    }

    let doc = Document::load_mem(bytes).map_err(|e| PdfError::NotPdf(e.to_string()))?;

    if doc.trailer.get(b"Encrypt").is_ok() {
        return Err(PdfError::PasswordProtected);
    }

    Ok(PdfInfo {
        page_count: doc.get_pages().len(),
        version: doc.version.clone(),
    })
}

/// Extract all text from PDF bytes.
///
/// Whitespace-only output counts as no text: scanned invoices land here.
pub fn extract_text(bytes: &[u8]) -> Result<String, PdfError> {
    if bytes.is_empty() {
        return Err(PdfError::Empty);
    }

    let text = extract_text_from_mem(bytes).map_err(|e| {
        let error_msg = e.to_string();
        let lowered = error_msg.to_lowercase();
        if lowered.contains("encrypted") || lowered.contains("password") {
            PdfError::PasswordProtected
        } else {
            PdfError::Extraction(error_msg)
        }
    })?;

    if text.trim().is_empty() {
        return Err(PdfError::NoText);
    }

    Ok(text)
}
