//! Per-invoice processing
//!
//! `InvoiceProcessor::process` never fails: every failure mode becomes a
//! Declined result whose reason names what went wrong, so one bad invoice
//! cannot sink the batch.

use std::sync::Arc;

use shared_types::{InvoiceAnalysis, InvoiceEntry};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::InvoiceFailure;
use crate::model::{ModelClient, ModelError};
use crate::parse::{parse_reply, Verdict};
use crate::prompt::PromptRequest;
use crate::reader::{run_blocking, DocumentReader};

/// Turns one archive entry into one result
pub struct InvoiceProcessor {
    reader: Arc<dyn DocumentReader>,
    model: Arc<dyn ModelClient>,
    config: EngineConfig,
}

impl InvoiceProcessor {
    pub fn new(
        reader: Arc<dyn DocumentReader>,
        model: Arc<dyn ModelClient>,
        config: EngineConfig,
    ) -> Self {
        Self {
            reader,
            model,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Analyse one invoice against the shared policy text
    pub async fn process(&self, entry: InvoiceEntry, policy_text: Arc<str>) -> InvoiceAnalysis {
        let name = entry.name.clone();

        match self.evaluate(entry, policy_text).await {
            Ok(verdict) => {
                debug!("{name}: {} ({})", verdict.status, verdict.amount);
                InvoiceAnalysis {
                    invoice_id: name,
                    status: verdict.status,
                    reimbursable_amount: verdict.amount,
                    reason: verdict.reason,
                }
            }
            Err(failure) => {
                warn!("{name}: {} ({})", failure, failure.kind());
                InvoiceAnalysis::declined(name, failure.to_string())
            }
        }
    }

    async fn evaluate(
        &self,
        entry: InvoiceEntry,
        policy_text: Arc<str>,
    ) -> Result<Verdict, InvoiceFailure> {
        let InvoiceEntry {
            name,
            bytes,
            oversized,
            unreadable,
        } = entry;

        if oversized {
            return Err(InvoiceFailure::InvoiceTextExtractionFailed(format!(
                "file exceeds the {} byte limit",
                self.config.max_entry_size
            )));
        }
        if let Some(reason) = unreadable {
            return Err(InvoiceFailure::InvoiceTextExtractionFailed(reason));
        }

        let invoice_text = self.extract_text(bytes).await?;
        let request = PromptRequest::new(policy_text, &name, invoice_text);
        let reply = self.invoke(&request).await?;

        parse_reply(&reply, self.config.enforce_consistency).inspect_err(|failure| {
            warn!("{name}: rejected model reply ({failure}); raw reply: {reply}");
        })
    }

    async fn extract_text(&self, bytes: Vec<u8>) -> Result<String, InvoiceFailure> {
        let reader = Arc::clone(&self.reader);
        run_blocking(self.config.extraction_timeout, move || reader.read_text(&bytes))
            .await
            .map_err(|e| InvoiceFailure::InvoiceTextExtractionFailed(e.to_string()))?
            .map_err(|e| InvoiceFailure::InvoiceTextExtractionFailed(e.to_string()))
    }

    async fn invoke(&self, request: &PromptRequest) -> Result<String, InvoiceFailure> {
        let limit = self.config.model_timeout;
        match tokio::time::timeout(limit, self.model.complete(request)).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(err)) => Err(InvoiceFailure::ModelInvocationFailed(err.to_string())),
            Err(_) => Err(InvoiceFailure::ModelInvocationFailed(
                ModelError::Timeout(limit).to_string(),
            )),
        }
    }
}
