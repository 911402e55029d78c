//! Per-pool tranche/slice structure and the payment waterfall.

pub mod tranche;
pub mod waterfall;

pub use tranche::{junior_id, senior_id, side_of, slice_index_of, Slice, Tranche, TrancheSide};
pub use waterfall::{distribute_payment, TrancheCredit, WaterfallReport};

use serde::{Deserialize, Serialize};

use crate::error::TranchePoolError;
use crate::leverage::LeverageStrategy;
use crate::types::{money_floor, CreditLineId, Money, PoolId, Rate, Timestamp, TrancheId};
use crate::TranchePoolResult;

/// One borrower pool: a credit line reference, its funding slices, and the
/// leverage strategy that sizes senior co-investment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranchedPool {
    pub id: PoolId,
    pub borrower: String,
    pub credit_line: CreditLineId,
    pub slices: Vec<Slice>,
    pub strategy: LeverageStrategy,
    /// Latest assessed markdown of the loan, for downstream consumers.
    pub writedown_percent: Rate,
    pub writedown_amount: Money,
}

impl TranchedPool {
    pub fn new(
        id: PoolId,
        borrower: impl Into<String>,
        credit_line: CreditLineId,
        strategy: LeverageStrategy,
        fundable_at: Timestamp,
    ) -> Self {
        Self {
            id,
            borrower: borrower.into(),
            credit_line,
            slices: vec![Slice::new(0, fundable_at)],
            strategy,
            writedown_percent: Rate::ZERO,
            writedown_amount: Money::ZERO,
        }
    }

    /// The slice currently open for funding (always the last one).
    pub fn current_slice(&self) -> &Slice {
        self.slices.last().expect("a pool always holds a slice")
    }

    pub fn current_slice_mut(&mut self) -> &mut Slice {
        self.slices.last_mut().expect("a pool always holds a slice")
    }

    /// The pool is locked once its current slice is fully locked.
    pub fn is_locked(&self) -> bool {
        self.current_slice().is_locked()
    }

    pub fn tranche(&self, id: TrancheId) -> TranchePoolResult<&Tranche> {
        self.slices
            .iter()
            .find_map(|slice| slice.tranche(id))
            .ok_or(TranchePoolError::UnknownId {
                kind: "tranche",
                id,
            })
    }

    pub fn tranche_mut(&mut self, id: TrancheId) -> TranchePoolResult<&mut Tranche> {
        self.slices
            .iter_mut()
            .find_map(|slice| slice.tranche_mut(id))
            .ok_or(TranchePoolError::UnknownId {
                kind: "tranche",
                id,
            })
    }

    pub fn total_deposited(&self) -> Money {
        self.slices.iter().map(Slice::total_deposited).sum()
    }

    /// Capital deposited but not yet drawn down, across all slices.
    pub fn total_undrawn(&self) -> Money {
        self.slices
            .iter()
            .map(|slice| slice.senior.principal_undrawn() + slice.junior.principal_undrawn())
            .sum()
    }

    /// Move `amount` of principal out of the pool for a drawdown,
    /// pro-rata against every tranche's undrawn capital.
    pub fn drawdown_principal(&mut self, amount: Money) -> TranchePoolResult<()> {
        let total_undrawn = self.total_undrawn();
        if amount > total_undrawn {
            return Err(TranchePoolError::ExceedsAvailable {
                requested: amount,
                available: total_undrawn,
            });
        }

        // Pro-rata split, with the floor residue topped up greedily so the
        // full amount always leaves the pool.
        let mut shares: Vec<(usize, TrancheId, Money)> = Vec::new();
        for slice in &self.slices {
            for tranche in [&slice.senior, &slice.junior] {
                let undrawn = tranche.principal_undrawn();
                if undrawn.is_zero() {
                    continue;
                }
                let share = money_floor(amount * undrawn / total_undrawn);
                shares.push((slice.index, tranche.id, share));
            }
        }
        let mut residual = amount - shares.iter().map(|(_, _, share)| *share).sum::<Money>();
        for (slice_index, id, share) in shares.iter_mut() {
            if residual.is_zero() {
                break;
            }
            let undrawn = self.slices[*slice_index]
                .tranche(*id)
                .expect("share entries reference existing tranches")
                .principal_undrawn();
            let top_up = residual.min(undrawn - *share);
            *share += top_up;
            residual -= top_up;
        }

        for (slice_index, id, share) in shares {
            if share.is_zero() {
                continue;
            }
            let slice = &mut self.slices[slice_index];
            slice
                .tranche_mut(id)
                .expect("share entries reference existing tranches")
                .debit_principal(share);
            slice.principal_deployed += share;
        }
        Ok(())
    }
}
