//! Error types for PDF and archive handling

use thiserror::Error;

/// Errors from probing or extracting text out of a PDF
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PdfError {
    #[error("Document is empty")]
    Empty,

    #[error("Not a PDF document: {0}")]
    NotPdf(String),

    #[error("PDF is password-protected")]
    PasswordProtected,

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("PDF contains no extractable text")]
    NoText,
}

/// Errors from unpacking an uploaded archive
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Archive is empty")]
    Empty,

    #[error("Invalid ZIP archive: {0}")]
    InvalidZip(#[from] zip::result::ZipError),
}
