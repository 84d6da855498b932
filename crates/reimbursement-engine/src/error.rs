//! Error kinds for the reimbursement engine
//!
//! `EngineError` fails a whole request. `InvoiceFailure` stays local to one
//! invoice and is folded into a Declined result by the processor.

use thiserror::Error;

/// Whole-request failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Invalid policy file: {0}")]
    InvalidPolicyFile(String),

    #[error("Invalid invoice archive: {0}")]
    InvalidInvoiceArchive(String),

    #[error("Could not extract text from the policy document: {0}")]
    PolicyTextExtractionFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Machine-readable kind, stable across releases
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidPolicyFile(_) => "INVALID_POLICY_FILE",
            Self::InvalidInvoiceArchive(_) => "INVALID_INVOICE_ARCHIVE",
            Self::PolicyTextExtractionFailed(_) => "POLICY_TEXT_EXTRACTION_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Failures confined to a single invoice
///
/// The `Display` text becomes the `Reason` of the Declined result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvoiceFailure {
    #[error("Invoice text extraction failed: {0}")]
    InvoiceTextExtractionFailed(String),

    #[error("Model invocation failed: {0}")]
    ModelInvocationFailed(String),

    #[error("Malformed model response: {0}")]
    MalformedModelResponse(String),
}

impl InvoiceFailure {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvoiceTextExtractionFailed(_) => "INVOICE_TEXT_EXTRACTION_FAILED",
            Self::ModelInvocationFailed(_) => "MODEL_INVOCATION_FAILED",
            Self::MalformedModelResponse(_) => "MALFORMED_MODEL_RESPONSE",
        }
    }
}
