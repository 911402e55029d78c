pub mod accrual;
pub mod claims;
pub mod config;
pub mod credit;
pub mod error;
pub mod gate;
pub mod ledger;
pub mod leverage;
pub mod pool;
pub mod types;

pub use error::TranchePoolError;
pub use types::*;

/// Standard result type for all tranche-pool operations
pub type TranchePoolResult<T> = Result<T, TranchePoolError>;
