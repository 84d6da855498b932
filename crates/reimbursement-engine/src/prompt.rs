//! Prompt construction
//!
//! One prompt per invoice: fixed instructions, the full policy text, and the
//! invoice text. The policy is shared across prompts of a batch.

use std::sync::Arc;

/// Fixed instructions sent as the system turn of every model call
pub const SYSTEM_INSTRUCTIONS: &str = r#"You are an HR reimbursement policy analyst. Evaluate one employee expense invoice against the company's HR Reimbursement Policy.

The complete policy is provided, followed by the text of a single invoice.

Method:
1. Read the policy and identify reimbursable categories, limits, restrictions and conditions.
2. Read the invoice: total amount, itemised expenses, date, purpose.
3. Decide which policy category the invoice falls under and apply that category's limits.
4. Compute the exact reimbursable amount under the policy.
5. Choose exactly one status:
   - "Fully Reimbursed": the whole invoice amount is eligible and within limits.
   - "Partially Reimbursed": only part of the amount is eligible.
   - "Declined": nothing is reimbursable.

Respond with a single JSON object and nothing else, with exactly these keys:
{
  "Invoice identifier": "<the invoice filename>",
  "Reimbursement Status": "Fully Reimbursed" | "Partially Reimbursed" | "Declined",
  "Reimbursable Amount": <non-negative integer>,
  "Reason": "<concise explanation citing the policy clause>"
}

Rules:
- Apply only the policy provided. Do not assume rules that are not written in it.
- "Reimbursable Amount" is an integer. It is 0 when the status is "Declined".
- "Reason" is required for every status. For "Fully Reimbursed" cite the supporting clause; for "Partially Reimbursed" state the limit or the excluded items; for "Declined" state the clause that excludes the expense."#;

/// Everything the model needs for one invoice
#[derive(Debug, Clone)]
pub struct PromptRequest {
    pub system: &'static str,
    pub policy_text: Arc<str>,
    pub invoice_name: String,
    pub invoice_text: String,
}

impl PromptRequest {
    pub fn new(policy_text: Arc<str>, invoice_name: &str, invoice_text: String) -> Self {
        Self {
            system: SYSTEM_INSTRUCTIONS,
            policy_text,
            invoice_name: invoice_name.to_string(),
            invoice_text,
        }
    }

    /// User turn: the policy, then the invoice, each fenced
    pub fn user_prompt(&self) -> String {
        format!(
            "HR Reimbursement Policy:\n```\n{policy}\n```\n\n\
             Invoice to analyze (filename: {name}):\n```\n{invoice}\n```\n\n\
             Analyze this invoice strictly according to the policy above and reply with the JSON object described in your instructions.",
            policy = self.policy_text.trim(),
            name = self.invoice_name,
            invoice = self.invoice_text.trim(),
        )
    }
}
