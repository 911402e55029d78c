use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::TranchePoolError;
use crate::types::{money_floor, share_price_delta, Money, Timestamp, TrancheId};
use crate::TranchePoolResult;

// ---------------------------------------------------------------------------
// Tranche ids
// ---------------------------------------------------------------------------

/// Risk side of a tranche within a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrancheSide {
    Senior,
    Junior,
}

/// Senior tranche id for slice `k`: odd ids.
pub fn senior_id(slice_index: usize) -> TrancheId {
    (2 * slice_index + 1) as TrancheId
}

/// Junior tranche id for slice `k`: even ids.
pub fn junior_id(slice_index: usize) -> TrancheId {
    (2 * slice_index + 2) as TrancheId
}

pub fn slice_index_of(tranche: TrancheId) -> usize {
    ((tranche - 1) / 2) as usize
}

pub fn side_of(tranche: TrancheId) -> TrancheSide {
    if tranche % 2 == 1 {
        TrancheSide::Senior
    } else {
        TrancheSide::Junior
    }
}

// ---------------------------------------------------------------------------
// Tranche
// ---------------------------------------------------------------------------

/// One side of a funding slice. Share prices express cumulative value owed
/// per unit of principal deposited: `interest_share_price` only ever rises;
/// `principal_share_price` starts at 1.0, falls on drawdown, and recovers
/// on repayment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tranche {
    pub id: TrancheId,
    pub principal_deposited: Money,
    pub principal_share_price: Decimal,
    pub interest_share_price: Decimal,
    /// Zero while unlocked; otherwise the end of the drawdown window.
    pub locked_until: Timestamp,
}

impl Tranche {
    pub fn new(id: TrancheId) -> Self {
        Self {
            id,
            principal_deposited: Money::ZERO,
            principal_share_price: Decimal::ONE,
            interest_share_price: Decimal::ZERO,
            locked_until: 0,
        }
    }

    pub fn side(&self) -> TrancheSide {
        side_of(self.id)
    }

    /// Locking is a one-way transition.
    pub fn is_locked(&self) -> bool {
        self.locked_until != 0
    }

    pub fn lock(&mut self, until: Timestamp) -> TranchePoolResult<()> {
        if self.is_locked() {
            return Err(TranchePoolError::AlreadyLocked { tranche: self.id });
        }
        self.locked_until = until;
        Ok(())
    }

    /// Principal currently deployed and not yet repaid, valued against the
    /// original deposits.
    pub fn principal_outstanding(&self) -> Money {
        let raw = self.principal_deposited * (Decimal::ONE - self.principal_share_price);
        money_floor(raw.max(Money::ZERO))
    }

    /// Principal still sitting undrawn in the tranche.
    pub fn principal_undrawn(&self) -> Money {
        money_floor(self.principal_deposited * self.principal_share_price)
    }

    /// Credit interest to the tranche, raising its interest share price.
    /// Returns the amount actually representable after floor rounding;
    /// the caller accounts for the difference as dust.
    pub fn credit_interest(&mut self, amount: Money) -> Money {
        if amount <= Money::ZERO || self.principal_deposited.is_zero() {
            return Money::ZERO;
        }
        let delta = share_price_delta(amount, self.principal_deposited);
        self.interest_share_price += delta;
        delta * self.principal_deposited
    }

    /// Credit a principal repayment, raising the principal share price.
    pub fn credit_principal(&mut self, amount: Money) -> Money {
        if amount <= Money::ZERO || self.principal_deposited.is_zero() {
            return Money::ZERO;
        }
        let delta = share_price_delta(amount, self.principal_deposited);
        self.principal_share_price += delta;
        delta * self.principal_deposited
    }

    /// Debit drawn-down principal, lowering the principal share price.
    pub fn debit_principal(&mut self, amount: Money) -> Money {
        if amount <= Money::ZERO || self.principal_deposited.is_zero() {
            return Money::ZERO;
        }
        let delta = share_price_delta(amount, self.principal_deposited);
        self.principal_share_price -= delta;
        delta * self.principal_deposited
    }
}

// ---------------------------------------------------------------------------
// Slice
// ---------------------------------------------------------------------------

/// One complete junior + senior funding round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slice {
    pub index: usize,
    pub senior: Tranche,
    pub junior: Tranche,
    /// Principal drawn against this slice and not yet repaid.
    pub principal_deployed: Money,
    /// Cumulative interest credited to this slice's tranches.
    pub total_interest_accrued: Money,
    /// Deposits are rejected before this time.
    pub fundable_at: Timestamp,
}

impl Slice {
    pub fn new(index: usize, fundable_at: Timestamp) -> Self {
        Self {
            index,
            senior: Tranche::new(senior_id(index)),
            junior: Tranche::new(junior_id(index)),
            principal_deployed: Money::ZERO,
            total_interest_accrued: Money::ZERO,
            fundable_at,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.senior.is_locked() && self.junior.is_locked()
    }

    pub fn total_deposited(&self) -> Money {
        self.senior.principal_deposited + self.junior.principal_deposited
    }

    pub fn tranche(&self, id: TrancheId) -> Option<&Tranche> {
        if self.senior.id == id {
            Some(&self.senior)
        } else if self.junior.id == id {
            Some(&self.junior)
        } else {
            None
        }
    }

    pub fn tranche_mut(&mut self, id: TrancheId) -> Option<&mut Tranche> {
        if self.senior.id == id {
            Some(&mut self.senior)
        } else if self.junior.id == id {
            Some(&mut self.junior)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    // -----------------------------------------------------------------------
    // Ids
    // -----------------------------------------------------------------------

    #[test]
    fn test_id_layout() {
        assert_eq!(senior_id(0), 1);
        assert_eq!(junior_id(0), 2);
        assert_eq!(senior_id(2), 5);
        assert_eq!(junior_id(2), 6);
        assert_eq!(slice_index_of(5), 2);
        assert_eq!(slice_index_of(6), 2);
        assert_eq!(side_of(1), TrancheSide::Senior);
        assert_eq!(side_of(4), TrancheSide::Junior);
    }

    // -----------------------------------------------------------------------
    // Locking
    // -----------------------------------------------------------------------

    #[test]
    fn test_lock_is_one_way() {
        let mut tranche = Tranche::new(1);
        assert!(!tranche.is_locked());
        tranche.lock(5_000).unwrap();
        assert!(tranche.is_locked());
        let err = tranche.lock(9_000).unwrap_err();
        assert!(matches!(err, TranchePoolError::AlreadyLocked { tranche: 1 }));
        assert_eq!(tranche.locked_until, 5_000);
    }

    // -----------------------------------------------------------------------
    // Share-price bookkeeping
    // -----------------------------------------------------------------------

    #[test]
    fn test_share_price_round_trip() {
        let mut tranche = Tranche::new(2);
        tranche.principal_deposited = dec!(10000);

        let debited = tranche.debit_principal(dec!(10000));
        assert_eq!(debited, dec!(10000));
        assert_eq!(tranche.principal_share_price, Decimal::ZERO);
        assert_eq!(tranche.principal_outstanding(), dec!(10000));
        assert_eq!(tranche.principal_undrawn(), Money::ZERO);

        let credited = tranche.credit_principal(dec!(2500));
        assert_eq!(credited, dec!(2500));
        assert_eq!(tranche.principal_share_price, dec!(0.25));
        assert_eq!(tranche.principal_outstanding(), dec!(7500));
    }

    #[test]
    fn test_interest_share_price_monotonic() {
        let mut tranche = Tranche::new(2);
        tranche.principal_deposited = dec!(10000);
        tranche.credit_interest(dec!(100));
        let first = tranche.interest_share_price;
        tranche.credit_interest(dec!(50));
        assert!(tranche.interest_share_price > first);
    }

    #[test]
    fn test_share_prices_freeze_at_zero_deposits() {
        let mut tranche = Tranche::new(2);
        assert_eq!(tranche.credit_interest(dec!(100)), Money::ZERO);
        assert_eq!(tranche.credit_principal(dec!(100)), Money::ZERO);
        assert_eq!(tranche.interest_share_price, Decimal::ZERO);
        assert_eq!(tranche.principal_share_price, Decimal::ONE);
    }

    // -----------------------------------------------------------------------
    // Slice
    // -----------------------------------------------------------------------

    #[test]
    fn test_slice_tranche_lookup() {
        let slice = Slice::new(1, 0);
        assert_eq!(slice.tranche(3).unwrap().side(), TrancheSide::Senior);
        assert_eq!(slice.tranche(4).unwrap().side(), TrancheSide::Junior);
        assert!(slice.tranche(1).is_none());
    }

    #[test]
    fn test_slice_locked_requires_both_sides() {
        let mut slice = Slice::new(0, 0);
        slice.junior.lock(5_000).unwrap();
        assert!(!slice.is_locked());
        slice.senior.lock(5_000).unwrap();
        assert!(slice.is_locked());
    }
}
