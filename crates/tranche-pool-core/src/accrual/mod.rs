//! Pure time-based financial math for one credit line: owed interest
//! (including late-fee interest), owed principal, write-down amounts, and
//! the strict-priority payment split.
//!
//! Everything here is a pure function of the supplied ledger time and the
//! credit line's stored state; nothing mutates.

pub mod interest;
pub mod payment;
pub mod writedown;

pub use interest::{assess_owed, interest_and_principal_owed, AccrualInput, AccrualOutput};
pub use payment::{allocate_payment, run_payment_allocation, PaymentAllocation, PaymentAllocationInput};
pub use writedown::{run_writedown, writedown_components, WritedownInput, WritedownOutput};
