//! Strict parsing of model replies
//!
//! A reply is accepted only if it is one JSON object with exactly the four
//! result fields. A single surrounding Markdown code fence is tolerated;
//! nothing inside the object is coerced.

use serde::Deserialize;
use shared_types::ReimbursementStatus;

use crate::error::InvoiceFailure;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelVerdict {
    #[serde(rename = "Invoice identifier")]
    #[allow(dead_code)] // Required for shape; the archive name is authoritative
    invoice_id: String,
    #[serde(rename = "Reimbursement Status")]
    status: ReimbursementStatus,
    #[serde(rename = "Reimbursable Amount")]
    amount: u64,
    #[serde(rename = "Reason")]
    reason: String,
}

/// The parts of a reply that flow into the result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub status: ReimbursementStatus,
    pub amount: u64,
    pub reason: String,
}

/// Remove one ```json ... ``` (or bare ```) wrapper if present.
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(newline) = rest.find('\n') else {
        return text;
    };
    let body = &rest[newline + 1..];
    match body.trim_end().strip_suffix("```") {
        Some(inner) => inner.trim(),
        None => text,
    }
}

const FIELDS: [&str; 4] = [
    "Invoice identifier",
    "Reimbursement Status",
    "Reimbursable Amount",
    "Reason",
];

/// Describe a decode failure without echoing any of the reply's content.
fn describe(err: &serde_json::Error) -> String {
    use serde_json::error::Category;

    let position = format!("line {} column {}", err.line(), err.column());
    match err.classify() {
        Category::Eof => "reply ends before the JSON object is complete".to_string(),
        Category::Syntax => format!("reply is not valid JSON (at {position})"),
        Category::Io => "reply could not be read".to_string(),
        Category::Data => {
            // Missing-field messages carry our own field name, nothing from the reply
            let message = err.to_string();
            let missing = message
                .strip_prefix("missing field `")
                .and_then(|rest| rest.split('`').next())
                .filter(|field| FIELDS.contains(field));
            match missing {
                Some(field) => format!("missing field \"{field}\""),
                None => format!("reply does not match the result schema (at {position})"),
            }
        }
    }
}

/// Validate a raw reply against the result schema.
///
/// With `enforce_consistency`, a Declined verdict must carry amount 0.
pub fn parse_reply(raw: &str, enforce_consistency: bool) -> Result<Verdict, InvoiceFailure> {
    let body = strip_code_fence(raw);

    let verdict: ModelVerdict = serde_json::from_str(body)
        .map_err(|e| InvoiceFailure::MalformedModelResponse(describe(&e)))?;

    if verdict.reason.trim().is_empty() {
        return Err(InvoiceFailure::MalformedModelResponse(
            "reason is empty".to_string(),
        ));
    }

    if enforce_consistency
        && verdict.status == ReimbursementStatus::Declined
        && verdict.amount != 0
    {
        return Err(InvoiceFailure::MalformedModelResponse(format!(
            "declined invoice with non-zero amount {}",
            verdict.amount
        )));
    }

    Ok(Verdict {
        status: verdict.status,
        amount: verdict.amount,
        reason: verdict.reason,
    })
}
