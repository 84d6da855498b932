//! Shared PDF handling utilities
//!
//! This crate provides PDF probing, text extraction, and unpacking of
//! ZIP bundles of documents, used by the reimbursement engine.

pub mod archive;
pub mod error;
pub mod text;

pub use archive::{unpack_zip, DEFAULT_MAX_ENTRY_SIZE};
pub use error::{ArchiveError, PdfError};
pub use text::{extract_text, probe, PdfInfo};

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
