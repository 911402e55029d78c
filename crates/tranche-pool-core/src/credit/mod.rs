//! Per-borrower credit lines: loan terms plus mutable accrual state.

pub mod line;

pub use line::{CreditLine, CreditTerms};
