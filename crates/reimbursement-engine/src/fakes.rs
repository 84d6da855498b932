//! In-memory fakes for the engine's seams (testing only)
//!
//! `PlainTextReader` stands in for PDF parsing and `ScriptedModel` for the
//! language model, so pipelines can be exercised without fixtures or network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use shared_pdf::PdfError;

use crate::model::{ModelClient, ModelError};
use crate::prompt::PromptRequest;
use crate::reader::DocumentReader;

// ---------------------------------------------------------------------------
// PlainTextReader
// ---------------------------------------------------------------------------

const TEXT_MAGIC: &[u8] = b"%TXT\n";

/// Reader for a trivial document format: `%TXT\n` followed by UTF-8 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextReader;

impl PlainTextReader {
    /// Encode `text` as a document this reader accepts
    pub fn document(text: &str) -> Vec<u8> {
        let mut bytes = TEXT_MAGIC.to_vec();
        bytes.extend_from_slice(text.as_bytes());
        bytes
    }
}

impl DocumentReader for PlainTextReader {
    fn probe(&self, bytes: &[u8]) -> Result<(), PdfError> {
        if bytes.is_empty() {
            return Err(PdfError::Empty);
        }
        if !bytes.starts_with(TEXT_MAGIC) {
            return Err(PdfError::NotPdf("missing %TXT header".to_string()));
        }
        Ok(())
    }

    fn read_text(&self, bytes: &[u8]) -> Result<String, PdfError> {
        self.probe(bytes)?;
        let text = std::str::from_utf8(&bytes[TEXT_MAGIC.len()..])
            .map_err(|e| PdfError::Extraction(e.to_string()))?;
        if text.trim().is_empty() {
            return Err(PdfError::NoText);
        }
        Ok(text.to_string())
    }
}

// ---------------------------------------------------------------------------
// ScriptedModel
// ---------------------------------------------------------------------------

/// Render a reply in the shape the model is asked for
pub fn verdict_json(invoice_id: &str, status: &str, amount: u64, reason: &str) -> String {
    serde_json::json!({
        "Invoice identifier": invoice_id,
        "Reimbursement Status": status,
        "Reimbursable Amount": amount,
        "Reason": reason,
    })
    .to_string()
}

#[derive(Debug, Default)]
struct Script {
    replies: HashMap<String, Result<String, ModelError>>,
    delays: HashMap<String, Duration>,
    fallback: Option<String>,
    prompts: Vec<PromptRequest>,
}

/// Model fake keyed by invoice name.
///
/// Clones share state, so a test can keep a handle after giving one away.
#[derive(Debug, Clone, Default)]
pub struct ScriptedModel {
    script: Arc<Mutex<Script>>,
    calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer prompts for `invoice_name` with `reply`
    pub fn reply(self, invoice_name: &str, reply: impl Into<String>) -> Self {
        self.script
            .lock()
            .unwrap()
            .replies
            .insert(invoice_name.to_string(), Ok(reply.into()));
        self
    }

    /// Fail prompts for `invoice_name` with `error`
    pub fn fail(self, invoice_name: &str, error: ModelError) -> Self {
        self.script
            .lock()
            .unwrap()
            .replies
            .insert(invoice_name.to_string(), Err(error));
        self
    }

    /// Sleep before answering `invoice_name`
    pub fn delay(self, invoice_name: &str, delay: Duration) -> Self {
        self.script
            .lock()
            .unwrap()
            .delays
            .insert(invoice_name.to_string(), delay);
        self
    }

    /// Reply used for invoices without a scripted answer
    pub fn fallback(self, reply: impl Into<String>) -> Self {
        self.script.lock().unwrap().fallback = Some(reply.into());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of prompts answered at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<PromptRequest> {
        self.script.lock().unwrap().prompts.clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn complete(&self, request: &PromptRequest) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let (answer, delay) = {
            let mut script = self.script.lock().unwrap();
            script.prompts.push(request.clone());
            let answer = match script.replies.get(&request.invoice_name) {
                Some(answer) => answer.clone(),
                None => script.fallback.clone().ok_or_else(|| {
                    ModelError::InvalidResponse(format!(
                        "no scripted reply for {}",
                        request.invoice_name
                    ))
                }),
            };
            (answer, script.delays.get(&request.invoice_name).copied())
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        answer
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
