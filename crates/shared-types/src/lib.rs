pub mod types;

pub use types::{BatchResponse, InvoiceAnalysis, InvoiceEntry, ReimbursementStatus};
