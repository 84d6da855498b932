//! Document reading seam
//!
//! The analyzer only needs two answers from a document: "is it one" and
//! "what text does it hold". `PdfDocumentReader` answers both with
//! shared-pdf; tests substitute their own reader.

use std::time::Duration;

use shared_pdf::PdfError;
use thiserror::Error;

/// Turns document bytes into text
pub trait DocumentReader: Send + Sync {
    /// Check the bytes parse as a document, without extracting text
    fn probe(&self, bytes: &[u8]) -> Result<(), PdfError>;

    /// Extract plain text; whitespace-only output is an error
    fn read_text(&self, bytes: &[u8]) -> Result<String, PdfError>;
}

/// PDF reader backed by lopdf (probe) and pdf-extract (text)
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfDocumentReader;

impl DocumentReader for PdfDocumentReader {
    fn probe(&self, bytes: &[u8]) -> Result<(), PdfError> {
        shared_pdf::probe(bytes).map(|_| ())
    }

    fn read_text(&self, bytes: &[u8]) -> Result<String, PdfError> {
        shared_pdf::extract_text(bytes)
    }
}

/// Why a blocking extraction did not produce a value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockingError {
    #[error("timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    #[error("extractor crashed: {0}")]
    Panicked(String),

    #[error("extraction task was cancelled")]
    Cancelled,
}

/// Run CPU-bound document work off the async workers, bounded by `limit`.
///
/// A timeout only stops waiting. Blocking work cannot be cancelled, so the
/// thread keeps running until the extractor returns and its result is
/// discarded. A document that hangs the extractor therefore holds one
/// thread of tokio's blocking pool (512 threads by default) for as long as
/// it hangs.
pub async fn run_blocking<T, F>(limit: Duration, work: F) -> Result<T, BlockingError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let handle = tokio::task::spawn_blocking(work);
    match tokio::time::timeout(limit, handle).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(join_err)) if join_err.is_panic() => Err(BlockingError::Panicked(join_err.to_string())),
        Ok(Err(_)) => Err(BlockingError::Cancelled),
        Err(_) => Err(BlockingError::TimedOut(limit)),
    }
}
