use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::TranchePoolError;
use crate::pool::TranchedPool;
use crate::types::{money_floor, with_metadata, ComputationOutput, Money, PoolId, Timestamp};
use crate::TranchePoolResult;

/// Hard ceiling on any leverage ratio (10x).
pub const LEVERAGE_RATIO_MAX: Decimal = dec!(10);

// ---------------------------------------------------------------------------
// Strategy variants
// ---------------------------------------------------------------------------

/// A single globally configured ratio, applied to every pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedLeverageRatio {
    pub ratio: Decimal,
}

impl FixedLeverageRatio {
    pub fn new(ratio: Decimal) -> TranchePoolResult<Self> {
        if ratio <= Decimal::ZERO {
            return Err(TranchePoolError::InvalidInput {
                field: "ratio".into(),
                reason: "must be positive".into(),
            });
        }
        if ratio > LEVERAGE_RATIO_MAX {
            return Err(TranchePoolError::RatioExceedsMax {
                ratio,
                max: LEVERAGE_RATIO_MAX,
            });
        }
        Ok(Self { ratio })
    }
}

/// A ratio set per pool and tied to one junior locking event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeverageRatioRecord {
    pub ratio: Decimal,
    /// The junior tranche's `locked_until` at set-time. A relock
    /// invalidates the record.
    pub junior_locked_until: Timestamp,
}

/// Lock facts about a pool's current slice, read before ratio updates.
#[derive(Debug, Clone, Copy)]
pub struct SliceLockState {
    pub junior_locked_until: Timestamp,
    pub senior_locked: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicLeverageRatio {
    #[serde(default)]
    ratios: HashMap<PoolId, LeverageRatioRecord>,
}

impl DynamicLeverageRatio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a ratio for one pool's current lock cycle.
    pub fn set_ratio(
        &mut self,
        pool_id: PoolId,
        lock_state: SliceLockState,
        ratio: Decimal,
        junior_locked_until: Timestamp,
        max_ratio: Decimal,
    ) -> TranchePoolResult<()> {
        if ratio <= Decimal::ZERO {
            return Err(TranchePoolError::InvalidInput {
                field: "ratio".into(),
                reason: "must be positive".into(),
            });
        }
        if ratio > max_ratio {
            return Err(TranchePoolError::RatioExceedsMax {
                ratio,
                max: max_ratio,
            });
        }
        if lock_state.junior_locked_until == 0 {
            return Err(TranchePoolError::JuniorNotLocked);
        }
        if junior_locked_until != lock_state.junior_locked_until {
            return Err(TranchePoolError::LockMismatch {
                supplied: junior_locked_until,
                current: lock_state.junior_locked_until,
            });
        }
        if lock_state.senior_locked {
            return Err(TranchePoolError::SeniorAlreadyLocked);
        }
        self.ratios.insert(
            pool_id,
            LeverageRatioRecord {
                ratio,
                junior_locked_until,
            },
        );
        Ok(())
    }

    pub fn record(&self, pool_id: PoolId) -> Option<&LeverageRatioRecord> {
        self.ratios.get(&pool_id)
    }
}

// ---------------------------------------------------------------------------
// The shared contract
// ---------------------------------------------------------------------------

/// Leverage strategy selected per pool. Both variants share one contract:
/// a ratio and an investment estimate against the current slice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LeverageStrategy {
    Fixed(FixedLeverageRatio),
    Dynamic(DynamicLeverageRatio),
}

impl LeverageStrategy {
    pub fn leverage_ratio(&self, pool: &TranchedPool) -> TranchePoolResult<Decimal> {
        match self {
            LeverageStrategy::Fixed(fixed) => Ok(fixed.ratio),
            LeverageStrategy::Dynamic(dynamic) => {
                let record = dynamic.record(pool.id).ok_or(TranchePoolError::RatioNotSet)?;
                let current = pool.current_slice().junior.locked_until;
                if record.junior_locked_until != current {
                    return Err(TranchePoolError::RatioObsolete {
                        snapshot: record.junior_locked_until,
                        current,
                    });
                }
                Ok(record.ratio)
            }
        }
    }

    /// Senior capital the strategy calls for on the current slice:
    /// `max(0, junior_deposited * ratio - senior_deposited)`.
    pub fn estimate_investment(&self, pool: &TranchedPool) -> TranchePoolResult<Money> {
        let ratio = self.leverage_ratio(pool)?;
        let slice = pool.current_slice();
        let levered = money_floor(slice.junior.principal_deposited * ratio);
        Ok((levered - slice.senior.principal_deposited).max(Money::ZERO))
    }
}

// ---------------------------------------------------------------------------
// Calculator entry point
// ---------------------------------------------------------------------------

/// Input for a standalone investment-sizing computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentEstimateInput {
    pub junior_principal_deposited: Money,
    pub senior_principal_deposited: Money,
    pub leverage_ratio: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentEstimate {
    /// Senior capacity implied by the junior deposit and the ratio.
    pub levered_capacity: Money,
    /// Net amount the senior investor should move in.
    pub investment_amount: Money,
}

pub fn run_investment_estimate(
    input: &InvestmentEstimateInput,
) -> TranchePoolResult<ComputationOutput<InvestmentEstimate>> {
    if input.junior_principal_deposited < Money::ZERO
        || input.senior_principal_deposited < Money::ZERO
    {
        return Err(TranchePoolError::InvalidInput {
            field: "principal_deposited".into(),
            reason: "cannot be negative".into(),
        });
    }
    if input.leverage_ratio <= Decimal::ZERO {
        return Err(TranchePoolError::InvalidInput {
            field: "leverage_ratio".into(),
            reason: "must be positive".into(),
        });
    }
    if input.leverage_ratio > LEVERAGE_RATIO_MAX {
        return Err(TranchePoolError::RatioExceedsMax {
            ratio: input.leverage_ratio,
            max: LEVERAGE_RATIO_MAX,
        });
    }

    let levered = money_floor(input.junior_principal_deposited * input.leverage_ratio);
    let estimate = InvestmentEstimate {
        levered_capacity: levered,
        investment_amount: (levered - input.senior_principal_deposited).max(Money::ZERO),
    };

    Ok(with_metadata(
        "Leverage sizing: junior deposits times ratio, net of existing senior capital",
        &serde_json::json!({
            "leverage_ratio": input.leverage_ratio.to_string(),
        }),
        Vec::new(),
        estimate,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
