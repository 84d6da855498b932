//! Reimbursement engine
//!
//! Takes a policy document and a ZIP bundle of invoices, asks a language
//! model to judge each invoice against the policy, and folds the answers
//! into one batch decision.
//!
//! ```text
//! AnalysisRequest ─► gate (policy probe, unpack, policy text)
//!                 ─► InvoiceProcessor × N (bounded, archive order)
//!                 ─► aggregate ─► BatchResponse
//! ```
//!
//! The two external seams are traits: [`DocumentReader`] for turning bytes
//! into text and [`ModelClient`] for the model call.

pub mod aggregate;
pub mod analyzer;
pub mod config;
pub mod error;
pub mod model;
pub mod parse;
pub mod processor;
pub mod prompt;
pub mod reader;

#[cfg(any(test, feature = "fakes"))]
pub mod fakes;

pub use aggregate::{overall_status, StatusCounts};
pub use analyzer::{AnalysisRequest, ReimbursementAnalyzer, Upload};
pub use config::EngineConfig;
pub use error::{EngineError, InvoiceFailure};
pub use model::{GeminiClient, GeminiConfig, ModelClient, ModelError};
pub use parse::{parse_reply, Verdict};
pub use processor::InvoiceProcessor;
pub use prompt::PromptRequest;
pub use reader::{DocumentReader, PdfDocumentReader};

pub use shared_types::{BatchResponse, InvoiceAnalysis, ReimbursementStatus};
