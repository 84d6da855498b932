//! API handlers for the reimbursement server
//!
//! Provides REST endpoints for:
//! - Health checks
//! - Invoice analysis (multipart upload)

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    Json,
};
use reimbursement_engine::{AnalysisRequest, Upload};
use serde::Serialize;
use shared_types::BatchResponse;
use tracing::{debug, info};

use crate::error::ServerError;
use crate::AppState;

/// Multipart field holding the policy PDF
pub const POLICY_FIELD: &str = "policy_file";
/// Multipart field holding the invoice ZIP
pub const INVOICES_FIELD: &str = "invoice_zip";

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler: GET /health
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "reimbursement-server",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Handler: POST /analyze_invoices
pub async fn handle_analyze_invoices(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<BatchResponse>, ServerError> {
    let multipart = multipart.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
    let request = read_uploads(multipart).await?;

    info!(
        "Analyze request: policy {} ({} bytes), archive {} ({} bytes)",
        upload_name(request.policy.as_ref()),
        request.policy.as_ref().map_or(0, |u| u.bytes.len()),
        upload_name(request.invoices.as_ref()),
        request.invoices.as_ref().map_or(0, |u| u.bytes.len()),
    );

    let response = state.analyzer.analyze(request).await?;
    Ok(Json(response))
}

/// Collect the two expected file fields, rejecting anything else
async fn read_uploads(mut multipart: Multipart) -> Result<AnalysisRequest, ServerError> {
    let mut request = AnalysisRequest::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        let slot = match name.as_str() {
            POLICY_FIELD => &mut request.policy,
            INVOICES_FIELD => &mut request.invoices,
            other => {
                return Err(ServerError::InvalidRequest(format!(
                    "unexpected field '{other}', expected '{POLICY_FIELD}' and '{INVOICES_FIELD}'"
                )))
            }
        };

        if slot.is_some() {
            return Err(ServerError::InvalidRequest(format!(
                "field '{name}' supplied more than once"
            )));
        }

        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        debug!("Received field {name}: {} bytes", bytes.len());

        *slot = Some(Upload {
            file_name,
            bytes: bytes.to_vec(),
        });
    }

    Ok(request)
}

/// Client-side stream problems (bad framing, body too large) are the caller's;
/// anything else is ours.
fn multipart_error(err: MultipartError) -> ServerError {
    if err.status().is_client_error() {
        ServerError::InvalidRequest(err.body_text())
    } else {
        ServerError::Internal(err.body_text())
    }
}

fn upload_name(upload: Option<&Upload>) -> &str {
    upload
        .and_then(|u| u.file_name.as_deref())
        .unwrap_or("<unnamed>")
}
