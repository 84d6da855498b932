use std::fmt;
use std::str::FromStr;

/// Outcome of checking one invoice against the policy.
///
/// Serialized with the human-readable labels the UI and the model both use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ReimbursementStatus {
    #[serde(rename = "Fully Reimbursed")]
    FullyReimbursed,
    #[serde(rename = "Partially Reimbursed")]
    PartiallyReimbursed,
    #[serde(rename = "Declined")]
    Declined,
}

impl ReimbursementStatus {
    pub const ALL: [ReimbursementStatus; 3] = [
        ReimbursementStatus::FullyReimbursed,
        ReimbursementStatus::PartiallyReimbursed,
        ReimbursementStatus::Declined,
    ];

    pub const fn label(&self) -> &'static str {
        match self {
            Self::FullyReimbursed => "Fully Reimbursed",
            Self::PartiallyReimbursed => "Partially Reimbursed",
            Self::Declined => "Declined",
        }
    }
}

impl fmt::Display for ReimbursementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ReimbursementStatus {
    type Err = String;

    /// Exact match only; the model is told the labels verbatim.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.label() == s)
            .ok_or_else(|| {
                format!(
                    "unknown reimbursement status '{s}'. Valid: Fully Reimbursed, Partially Reimbursed, Declined"
                )
            })
    }
}

/// Per-invoice decision as returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InvoiceAnalysis {
    #[serde(rename = "Invoice identifier")]
    pub invoice_id: String,
    #[serde(rename = "Reimbursement Status")]
    pub status: ReimbursementStatus,
    #[serde(rename = "Reimbursable Amount")]
    pub reimbursable_amount: u64,
    #[serde(rename = "Reason")]
    pub reason: String,
}

impl InvoiceAnalysis {
    /// A declined result carrying a failure explanation; amount is always 0.
    pub fn declined(invoice_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            invoice_id: invoice_id.into(),
            status: ReimbursementStatus::Declined,
            reimbursable_amount: 0,
            reason: reason.into(),
        }
    }
}

/// Response for one analysis request.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BatchResponse {
    pub overall_status: ReimbursementStatus,
    pub invoice_analyses: Vec<InvoiceAnalysis>, // Archive listing order
}

/// One file taken out of the uploaded invoice archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceEntry {
    pub name: String,   // Archive-relative, sanitized
    pub bytes: Vec<u8>, // Empty when oversized or unreadable
    pub oversized: bool,
    /// Set when the entry is listed but its contents could not be read
    pub unreadable: Option<String>,
}

impl InvoiceEntry {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
            oversized: false,
            unreadable: None,
        }
    }

    /// Entry over the size limit; contents dropped
    pub fn oversized(name: impl Into<String>) -> Self {
        Self {
            oversized: true,
            ..Self::new(name, Vec::new())
        }
    }

    /// Entry whose data could not be read (encrypted, corrupt)
    pub fn unreadable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            unreadable: Some(reason.into()),
            ..Self::new(name, Vec::new())
        }
    }
}
