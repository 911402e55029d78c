use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranchePoolError {
    #[error("Not authorized: {address} may not {operation}")]
    NotAuthorized { address: String, operation: String },

    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Unknown {kind} id: {id}")]
    UnknownId { kind: &'static str, id: u64 },

    #[error("Tranche {tranche} is locked")]
    TrancheLocked { tranche: u64 },

    #[error("Tranche {tranche} is already locked")]
    AlreadyLocked { tranche: u64 },

    #[error("Junior tranche must be locked first")]
    JuniorNotLocked,

    #[error("Senior tranche is already locked")]
    SeniorAlreadyLocked,

    #[error("Pool must be locked before this operation")]
    PoolNotLocked,

    #[error("Tranche {tranche} is not open for funding until {fundable_at}")]
    NotOpenForFunding { tranche: u64, fundable_at: u64 },

    #[error("Pool already holds the maximum number of slices ({max})")]
    SliceLimitReached { max: usize },

    #[error("Current slice must be fully locked before a new slice is opened")]
    SliceStillOpen,

    #[error("Borrower is late on payments")]
    BorrowerLate,

    #[error("Loan is beyond its principal grace period")]
    BeyondPrincipalGracePeriod,

    #[error("Leverage ratio has not been set for this pool")]
    RatioNotSet,

    #[error(
        "Leverage ratio is obsolete: set against junior lock {snapshot}, junior tranche is now locked until {current}"
    )]
    RatioObsolete { snapshot: u64, current: u64 },

    #[error("Leverage ratio {ratio} exceeds the maximum of {max}")]
    RatioExceedsMax { ratio: Decimal, max: Decimal },

    #[error("Supplied junior lock timestamp {supplied} does not match the current lock {current}")]
    LockMismatch { supplied: u64, current: u64 },

    #[error("Drawdown window closed at {closed_at}")]
    DrawdownWindowClosed { closed_at: u64 },

    #[error("Requested {requested} exceeds the available amount {available}")]
    ExceedsAvailable {
        requested: Decimal,
        available: Decimal,
    },

    #[error("Mismatched batch: {ids} ticket ids against {amounts} amounts")]
    MismatchedBatch { ids: usize, amounts: usize },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for TranchePoolError {
    fn from(e: serde_json::Error) -> Self {
        TranchePoolError::SerializationError(e.to_string())
    }
}
