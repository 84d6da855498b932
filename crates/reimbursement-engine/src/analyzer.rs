//! Batch analysis pipeline
//!
//! Validates the two uploads, extracts the policy once, unpacks the archive,
//! fans invoices out to the processor with bounded concurrency and collects
//! results back in archive order.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use shared_pdf::{unpack_zip, ArchiveError, PdfError};
use shared_types::{BatchResponse, InvoiceEntry};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::aggregate::{overall_status, StatusCounts};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::model::ModelClient;
use crate::processor::InvoiceProcessor;
use crate::reader::{run_blocking, BlockingError, DocumentReader, PdfDocumentReader};

/// One uploaded file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Upload {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: Some(file_name.into()),
            bytes,
        }
    }
}

/// The two payloads of an analysis request; either may be missing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub policy: Option<Upload>,
    pub invoices: Option<Upload>,
}

/// Entry point: policy + invoice archive in, batch decision out
pub struct ReimbursementAnalyzer {
    reader: Arc<dyn DocumentReader>,
    processor: InvoiceProcessor,
}

impl ReimbursementAnalyzer {
    pub fn new(
        config: EngineConfig,
        reader: Arc<dyn DocumentReader>,
        model: Arc<dyn ModelClient>,
    ) -> Self {
        let processor = InvoiceProcessor::new(Arc::clone(&reader), model, config);
        Self { reader, processor }
    }

    /// Analyzer reading real PDFs
    pub fn with_pdf_reader(config: EngineConfig, model: Arc<dyn ModelClient>) -> Self {
        Self::new(config, Arc::new(PdfDocumentReader), model)
    }

    pub fn config(&self) -> &EngineConfig {
        self.processor.config()
    }

    /// Run the whole pipeline for one request.
    ///
    /// # Errors
    /// Whole-request failures only; per-invoice problems are reported as
    /// Declined entries in the response.
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<BatchResponse, EngineError> {
        let request_id = Uuid::new_v4();
        let span = info_span!("analysis", %request_id);
        self.run(request).instrument(span).await
    }

    async fn run(&self, request: AnalysisRequest) -> Result<BatchResponse, EngineError> {
        let (policy, invoices) = validate_presence(request)?;
        let config = self.config().clone();

        let policy_bytes = Arc::new(policy.bytes);
        self.probe_policy(Arc::clone(&policy_bytes)).await?;

        let entries = unpack_invoices(invoices.bytes, &config).await?;
        info!(
            "Policy accepted, {} invoice(s) in {}",
            entries.len(),
            invoices.file_name.as_deref().unwrap_or("archive")
        );

        let policy_text = self.extract_policy_text(policy_bytes).await?;

        let processor = &self.processor;
        let invoice_analyses: Vec<_> = stream::iter(entries)
            .map(|entry| processor.process(entry, Arc::clone(&policy_text)))
            .buffered(config.effective_concurrency())
            .collect()
            .await;

        let counts = StatusCounts::tally(&invoice_analyses);
        let overall_status = overall_status(&invoice_analyses);
        info!(
            "Batch done: {} fully, {} partially, {} declined -> {}",
            counts.fully, counts.partially, counts.declined, overall_status
        );

        Ok(BatchResponse {
            overall_status,
            invoice_analyses,
        })
    }

    async fn probe_policy(&self, bytes: Arc<Vec<u8>>) -> Result<(), EngineError> {
        let reader = Arc::clone(&self.reader);
        let limit = self.config().extraction_timeout;
        run_blocking(limit, move || reader.probe(&bytes))
            .await
            .map_err(|e| blocking_to_engine(e, EngineError::InvalidPolicyFile))?
            .map_err(|e| match e {
                PdfError::Empty => EngineError::InvalidPolicyFile("policy file is empty".into()),
                other => EngineError::InvalidPolicyFile(other.to_string()),
            })
    }

    async fn extract_policy_text(&self, bytes: Arc<Vec<u8>>) -> Result<Arc<str>, EngineError> {
        let reader = Arc::clone(&self.reader);
        let limit = self.config().extraction_timeout;
        let text = run_blocking(limit, move || reader.read_text(&bytes))
            .await
            .map_err(|e| blocking_to_engine(e, EngineError::PolicyTextExtractionFailed))?
            .map_err(|e| EngineError::PolicyTextExtractionFailed(e.to_string()))?;

        Ok(Arc::from(text))
    }
}

fn validate_presence(request: AnalysisRequest) -> Result<(Upload, Upload), EngineError> {
    let policy = match request.policy {
        Some(upload) if !upload.bytes.is_empty() => upload,
        Some(_) => return Err(EngineError::InvalidPolicyFile("policy file is empty".into())),
        None => return Err(EngineError::InvalidPolicyFile("policy file is missing".into())),
    };

    if let Some(name) = policy.file_name.as_deref() {
        if !name.is_empty() && !name.to_lowercase().ends_with(".pdf") {
            return Err(EngineError::InvalidPolicyFile(format!(
                "policy file must be a PDF, got '{name}'"
            )));
        }
    }

    let invoices = match request.invoices {
        Some(upload) if !upload.bytes.is_empty() => upload,
        Some(_) => {
            return Err(EngineError::InvalidInvoiceArchive(
                "invoice archive is empty".into(),
            ))
        }
        None => {
            return Err(EngineError::InvalidInvoiceArchive(
                "invoice archive is missing".into(),
            ))
        }
    };

    Ok((policy, invoices))
}

async fn unpack_invoices(
    bytes: Vec<u8>,
    config: &EngineConfig,
) -> Result<Vec<InvoiceEntry>, EngineError> {
    let max_entry_size = config.max_entry_size;
    let entries = run_blocking(config.extraction_timeout, move || {
        unpack_zip(&bytes, max_entry_size)
    })
    .await
    .map_err(|e| blocking_to_engine(e, EngineError::InvalidInvoiceArchive))?
    .map_err(|e| match e {
        ArchiveError::Empty => EngineError::InvalidInvoiceArchive("invoice archive is empty".into()),
        other => EngineError::InvalidInvoiceArchive(other.to_string()),
    })?;

    if entries.is_empty() {
        return Err(EngineError::InvalidInvoiceArchive(
            "no invoice files found in the archive".into(),
        ));
    }

    Ok(entries)
}

/// A cancelled blocking task means the runtime is going away, not bad input.
fn blocking_to_engine(err: BlockingError, kind: fn(String) -> EngineError) -> EngineError {
    match err {
        BlockingError::Cancelled => EngineError::Internal(err.to_string()),
        other => kind(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use shared_pdf::fixtures::{zip_of, zip_with_corrupt, zip_with_locked};
    use shared_types::ReimbursementStatus;

    use crate::fakes::{verdict_json, PlainTextReader, ScriptedModel};

    fn analyzer(model: &ScriptedModel) -> ReimbursementAnalyzer {
        ReimbursementAnalyzer::new(
            EngineConfig::default(),
            Arc::new(PlainTextReader),
            Arc::new(model.clone()),
        )
    }

    fn policy_upload(text: &str) -> Option<Upload> {
        Some(Upload::new("policy.pdf", PlainTextReader::document(text)))
    }

    fn archive_upload(entries: &[(&str, Vec<u8>)]) -> Option<Upload> {
        Some(Upload::new("invoices.zip", zip_of(entries)))
    }

    fn doc(text: &str) -> Vec<u8> {
        PlainTextReader::document(text)
    }

    #[tokio::test]
    async fn test_meal_within_limit_scenario() {
        let model = ScriptedModel::new().reply(
            "meal.pdf",
            verdict_json("meal.pdf", "Fully Reimbursed", 30, "Meals up to $50/day are covered"),
        );

        let response = analyzer(&model)
            .analyze(AnalysisRequest {
                policy: policy_upload("Meals reimbursed up to $50/day"),
                invoices: archive_upload(&[("meal.pdf", doc("Lunch, total $30"))]),
            })
            .await
            .unwrap();

        assert_eq!(response.overall_status, ReimbursementStatus::FullyReimbursed);
        assert_eq!(response.invoice_analyses.len(), 1);
        assert_eq!(response.invoice_analyses[0].reimbursable_amount, 30);
    }

    #[tokio::test]
    async fn test_corrupted_entry_among_valid_ones() {
        let model = ScriptedModel::new()
            .reply("a.pdf", verdict_json("a.pdf", "Fully Reimbursed", 10, "ok"))
            .reply("c.pdf", verdict_json("c.pdf", "Fully Reimbursed", 20, "ok"));

        let response = analyzer(&model)
            .analyze(AnalysisRequest {
                policy: policy_upload("Everything under $100"),
                invoices: archive_upload(&[
                    ("a.pdf", doc("Taxi $10")),
                    ("b.pdf", b"\xff\xfe not a document".to_vec()),
                    ("c.pdf", doc("Lunch $20")),
                ]),
            })
            .await
            .unwrap();

        let ids: Vec<_> = response
            .invoice_analyses
            .iter()
            .map(|a| a.invoice_id.as_str())
            .collect();
        assert_eq!(ids, vec!["a.pdf", "b.pdf", "c.pdf"]);

        let corrupted = &response.invoice_analyses[1];
        assert_eq!(corrupted.status, ReimbursementStatus::Declined);
        assert_eq!(corrupted.reimbursable_amount, 0);
        assert!(corrupted.reason.contains("extraction failed"), "{}", corrupted.reason);

        assert_eq!(response.invoice_analyses[0].reimbursable_amount, 10);
        assert_eq!(response.invoice_analyses[2].reimbursable_amount, 20);
        assert_eq!(response.overall_status, ReimbursementStatus::PartiallyReimbursed);
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn test_malformed_reply_only_affects_its_invoice() {
        let model = ScriptedModel::new()
            .reply("good.pdf", verdict_json("good.pdf", "Partially Reimbursed", 50, "capped"))
            .reply("bad.pdf", "{\"Reimbursement Status\": Declined");

        let response = analyzer(&model)
            .analyze(AnalysisRequest {
                policy: policy_upload("Meals up to $50"),
                invoices: archive_upload(&[
                    ("good.pdf", doc("Dinner $80")),
                    ("bad.pdf", doc("Dinner $20")),
                ]),
            })
            .await
            .unwrap();

        assert_eq!(response.invoice_analyses[0].status, ReimbursementStatus::PartiallyReimbursed);
        assert_eq!(response.invoice_analyses[0].reimbursable_amount, 50);
        assert_eq!(response.invoice_analyses[1].status, ReimbursementStatus::Declined);
        assert!(response.invoice_analyses[1]
            .reason
            .starts_with("Malformed model response"));
    }

    #[tokio::test]
    async fn test_zero_byte_archive_rejected_before_model() {
        let model = ScriptedModel::new();
        let err = analyzer(&model)
            .analyze(AnalysisRequest {
                policy: policy_upload("Policy"),
                invoices: Some(Upload::new("invoices.zip", Vec::new())),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::InvalidInvoiceArchive(_)), "{err:?}");
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_archive_without_files_rejected() {
        let model = ScriptedModel::new();
        let err = analyzer(&model)
            .analyze(AnalysisRequest {
                policy: policy_upload("Policy"),
                invoices: archive_upload(&[("folder/", Vec::new())]),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::InvalidInvoiceArchive(_)));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_non_zip_archive_rejected() {
        let model = ScriptedModel::new();
        let err = analyzer(&model)
            .analyze(AnalysisRequest {
                policy: policy_upload("Policy"),
                invoices: Some(Upload::new("invoices.zip", b"not a zip".to_vec())),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::InvalidInvoiceArchive(_)));
    }

    #[tokio::test]
    async fn test_policy_without_text_rejected_before_model() {
        let model = ScriptedModel::new();
        let err = analyzer(&model)
            .analyze(AnalysisRequest {
                policy: policy_upload("   \n  "),
                invoices: archive_upload(&[("a.pdf", doc("Taxi $10"))]),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::PolicyTextExtractionFailed(_)), "{err:?}");
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_policy_gate() {
        let model = ScriptedModel::new();
        let analyzer = analyzer(&model);
        let invoices = archive_upload(&[("a.pdf", doc("Taxi $10"))]);

        let missing = analyzer
            .analyze(AnalysisRequest {
                policy: None,
                invoices: invoices.clone(),
            })
            .await
            .unwrap_err();
        assert!(matches!(missing, EngineError::InvalidPolicyFile(_)));

        let wrong_extension = analyzer
            .analyze(AnalysisRequest {
                policy: Some(Upload::new("policy.docx", doc("Policy"))),
                invoices: invoices.clone(),
            })
            .await
            .unwrap_err();
        assert!(matches!(wrong_extension, EngineError::InvalidPolicyFile(_)));

        let not_a_document = analyzer
            .analyze(AnalysisRequest {
                policy: Some(Upload::new("policy.pdf", b"plain words".to_vec())),
                invoices,
            })
            .await
            .unwrap_err();
        assert!(matches!(not_a_document, EngineError::InvalidPolicyFile(_)));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_archive_rejected() {
        let model = ScriptedModel::new();
        let err = analyzer(&model)
            .analyze(AnalysisRequest {
                policy: policy_upload("Policy"),
                invoices: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInvoiceArchive(_)));
    }

    #[tokio::test]
    async fn test_concurrent_results_stay_in_archive_order() {
        // First invoice answers last
        let model = ScriptedModel::new()
            .fallback(verdict_json("x", "Fully Reimbursed", 1, "ok"))
            .delay("first.pdf", Duration::from_millis(150))
            .delay("second.pdf", Duration::from_millis(50));

        let analyzer = ReimbursementAnalyzer::new(
            EngineConfig::default().with_concurrency(3),
            Arc::new(PlainTextReader),
            Arc::new(model.clone()),
        );

        let response = analyzer
            .analyze(AnalysisRequest {
                policy: policy_upload("Policy"),
                invoices: archive_upload(&[
                    ("first.pdf", doc("1")),
                    ("second.pdf", doc("2")),
                    ("third.pdf", doc("3")),
                ]),
            })
            .await
            .unwrap();

        let ids: Vec<_> = response
            .invoice_analyses
            .iter()
            .map(|a| a.invoice_id.as_str())
            .collect();
        assert_eq!(ids, vec!["first.pdf", "second.pdf", "third.pdf"]);
        assert!(model.peak_in_flight() > 1);
        assert!(model.peak_in_flight() <= 3);
    }

    #[tokio::test]
    async fn test_concurrency_of_one_is_sequential() {
        let model = ScriptedModel::new()
            .fallback(verdict_json("x", "Declined", 0, "no"))
            .delay("a.pdf", Duration::from_millis(20))
            .delay("b.pdf", Duration::from_millis(20));

        let analyzer = ReimbursementAnalyzer::new(
            EngineConfig::default().with_concurrency(1),
            Arc::new(PlainTextReader),
            Arc::new(model.clone()),
        );

        let response = analyzer
            .analyze(AnalysisRequest {
                policy: policy_upload("Policy"),
                invoices: archive_upload(&[("a.pdf", doc("a")), ("b.pdf", doc("b"))]),
            })
            .await
            .unwrap();

        assert_eq!(response.overall_status, ReimbursementStatus::Declined);
        assert_eq!(model.peak_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_bad_entries_are_declined_individually() {
        let model = ScriptedModel::new()
            .fallback(verdict_json("x", "Fully Reimbursed", 10, "Covered"));
        let analyzer = analyzer(&model);

        let locked = analyzer
            .analyze(AnalysisRequest {
                policy: policy_upload("Everything under $100"),
                invoices: Some(Upload::new(
                    "invoices.zip",
                    zip_with_locked(
                        &[("a.pdf", doc("Taxi $10")), ("secret.pdf", doc("Hotel $80"))],
                        &["secret.pdf"],
                    ),
                )),
            })
            .await
            .unwrap();

        assert_eq!(locked.invoice_analyses.len(), 2);
        assert_eq!(locked.invoice_analyses[0].status, ReimbursementStatus::FullyReimbursed);
        assert_eq!(locked.invoice_analyses[1].invoice_id, "secret.pdf");
        assert_eq!(locked.invoice_analyses[1].status, ReimbursementStatus::Declined);
        assert!(locked.invoice_analyses[1].reason.contains("password-protected"));

        let corrupt = analyzer
            .analyze(AnalysisRequest {
                policy: policy_upload("Everything under $100"),
                invoices: Some(Upload::new(
                    "invoices.zip",
                    zip_with_corrupt(
                        &[("a.pdf", doc("Taxi $10")), ("b.pdf", doc("Hotel $80"))],
                        "b.pdf",
                    ),
                )),
            })
            .await
            .unwrap();

        assert_eq!(corrupt.invoice_analyses.len(), 2);
        assert_eq!(corrupt.invoice_analyses[0].reimbursable_amount, 10);
        assert_eq!(corrupt.invoice_analyses[1].status, ReimbursementStatus::Declined);
        assert!(corrupt.invoice_analyses[1]
            .reason
            .starts_with("Invoice text extraction failed"));
        assert_eq!(corrupt.overall_status, ReimbursementStatus::PartiallyReimbursed);

        // One model call per readable invoice across both requests
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn test_same_request_twice_gives_same_response() {
        let model = ScriptedModel::new()
            .reply("meal.pdf", verdict_json("meal.pdf", "Partially Reimbursed", 50, "Capped"))
            .reply("gift.pdf", verdict_json("gift.pdf", "Declined", 0, "Gifts excluded"));
        let analyzer = analyzer(&model);

        let request = AnalysisRequest {
            policy: policy_upload("Meals up to $50, no gifts"),
            invoices: archive_upload(&[
                ("meal.pdf", doc("Dinner $80")),
                ("broken.pdf", b"garbage".to_vec()),
                ("gift.pdf", doc("Flowers $30")),
            ]),
        };

        let first = analyzer.analyze(request.clone()).await.unwrap();
        let second = analyzer.analyze(request).await.unwrap();

        let summary = |response: &BatchResponse| {
            response
                .invoice_analyses
                .iter()
                .map(|a| (a.invoice_id.clone(), a.status, a.reimbursable_amount))
                .collect::<Vec<_>>()
        };
        assert_eq!(summary(&first), summary(&second));
        assert_eq!(first.overall_status, second.overall_status);
        assert_eq!(first, second);
    }
}
