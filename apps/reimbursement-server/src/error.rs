//! Error types for the reimbursement server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use reimbursement_engine::EngineError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid policy file: {0}")]
    InvalidPolicyFile(String),

    #[error("Invalid invoice archive: {0}")]
    InvalidInvoiceArchive(String),

    #[error("Policy text extraction failed: {0}")]
    PolicyTextExtractionFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    code: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ServerError::InvalidPolicyFile(msg) => (
                StatusCode::BAD_REQUEST,
                "INVALID_POLICY_FILE",
                format!("Invalid policy file: {}", msg),
            ),
            ServerError::InvalidInvoiceArchive(msg) => (
                StatusCode::BAD_REQUEST,
                "INVALID_INVOICE_ARCHIVE",
                format!("Invalid invoice archive: {}", msg),
            ),
            ServerError::PolicyTextExtractionFailed(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "POLICY_TEXT_EXTRACTION_FAILED",
                format!("Could not extract text from the policy document: {}", msg),
            ),
            ServerError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST", msg.clone())
            }
            ServerError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidPolicyFile(msg) => ServerError::InvalidPolicyFile(msg),
            EngineError::InvalidInvoiceArchive(msg) => ServerError::InvalidInvoiceArchive(msg),
            EngineError::PolicyTextExtractionFailed(msg) => {
                ServerError::PolicyTextExtractionFailed(msg)
            }
            EngineError::Internal(msg) => ServerError::Internal(msg),
        }
    }
}
