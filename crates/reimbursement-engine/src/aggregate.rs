//! Batch-level status

use shared_types::{InvoiceAnalysis, ReimbursementStatus};

/// Per-status tallies for one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub fully: usize,
    pub partially: usize,
    pub declined: usize,
}

impl StatusCounts {
    pub fn tally(results: &[InvoiceAnalysis]) -> Self {
        results.iter().fold(Self::default(), |mut counts, r| {
            match r.status {
                ReimbursementStatus::FullyReimbursed => counts.fully += 1,
                ReimbursementStatus::PartiallyReimbursed => counts.partially += 1,
                ReimbursementStatus::Declined => counts.declined += 1,
            }
            counts
        })
    }

    pub fn total(&self) -> usize {
        self.fully + self.partially + self.declined
    }
}

/// Summarise a batch.
///
/// All fully reimbursed gives Fully Reimbursed, all declined gives Declined,
/// any other mix is Partially Reimbursed. An empty batch has nothing to pay
/// out and is Declined.
pub fn overall_status(results: &[InvoiceAnalysis]) -> ReimbursementStatus {
    let counts = StatusCounts::tally(results);
    let total = counts.total();

    if total == 0 || counts.declined == total {
        ReimbursementStatus::Declined
    } else if counts.fully == total {
        ReimbursementStatus::FullyReimbursed
    } else {
        ReimbursementStatus::PartiallyReimbursed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::ReimbursementStatus::*;

    fn batch(statuses: &[ReimbursementStatus]) -> Vec<InvoiceAnalysis> {
        statuses
            .iter()
            .enumerate()
            .map(|(i, status)| InvoiceAnalysis {
                invoice_id: format!("{i}.pdf"),
                status: *status,
                reimbursable_amount: 0,
                reason: "r".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_all_fully_reimbursed() {
        assert_eq!(overall_status(&batch(&[FullyReimbursed, FullyReimbursed])), FullyReimbursed);
    }

    #[test]
    fn test_all_declined() {
        assert_eq!(overall_status(&batch(&[Declined, Declined, Declined])), Declined);
    }

    #[test]
    fn test_mixtures_are_partial() {
        assert_eq!(overall_status(&batch(&[FullyReimbursed, Declined])), PartiallyReimbursed);
        assert_eq!(overall_status(&batch(&[PartiallyReimbursed])), PartiallyReimbursed);
        assert_eq!(
            overall_status(&batch(&[FullyReimbursed, PartiallyReimbursed])),
            PartiallyReimbursed
        );
    }

    #[test]
    fn test_empty_batch_is_declined() {
        assert_eq!(overall_status(&[]), Declined);
    }

    #[test]
    fn test_tally() {
        let counts = StatusCounts::tally(&batch(&[FullyReimbursed, Declined, Declined]));
        assert_eq!(
            counts,
            StatusCounts {
                fully: 1,
                partially: 0,
                declined: 2
            }
        );
        assert_eq!(counts.total(), 3);
    }
}
