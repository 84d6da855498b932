//! Engine configuration
//!
//! Built once at process start and handed to the analyzer; nothing here is
//! read from ambient globals.

use std::time::Duration;

use shared_pdf::DEFAULT_MAX_ENTRY_SIZE;

/// Limits and behaviour switches for one analyzer instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Invoices analysed at once within one request
    pub concurrency: usize,
    /// Upper bound on a single model call
    pub model_timeout: Duration,
    /// Upper bound on extracting text from one document
    pub extraction_timeout: Duration,
    /// Archive entries larger than this are declined unread
    pub max_entry_size: u64,
    /// Reject model replies that decline with a non-zero amount
    pub enforce_consistency: bool,
}

impl EngineConfig {
    pub const DEFAULT_CONCURRENCY: usize = 4;

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    pub fn with_extraction_timeout(mut self, timeout: Duration) -> Self {
        self.extraction_timeout = timeout;
        self
    }

    pub fn with_max_entry_size(mut self, bytes: u64) -> Self {
        self.max_entry_size = bytes;
        self
    }

    /// Effective fan-out width, never zero
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: Self::DEFAULT_CONCURRENCY,
            model_timeout: Duration::from_secs(60),
            extraction_timeout: Duration::from_secs(30),
            max_entry_size: DEFAULT_MAX_ENTRY_SIZE,
            enforce_consistency: true,
        }
    }
}
