use serde::{Deserialize, Serialize};

use crate::error::TranchePoolError;
use crate::pool::Tranche;
use crate::types::{money_floor, Money, PoolId, TicketId, Timestamp, TrancheId};
use crate::TranchePoolResult;

/// Transferable record of one deposit's entitlement to a tranche's
/// proceeds. Globally addressable, independent of the pool that minted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimTicket {
    pub id: TicketId,
    pub pool: PoolId,
    pub tranche: TrancheId,
    pub holder: String,
    /// Original deposit, reduced only by pre-lock withdrawal.
    pub principal_amount: Money,
    pub principal_redeemed: Money,
    pub interest_redeemed: Money,
}

impl ClaimTicket {
    pub fn new(
        id: TicketId,
        pool: PoolId,
        tranche: TrancheId,
        holder: impl Into<String>,
        principal_amount: Money,
    ) -> Self {
        Self {
            id,
            pool,
            tranche,
            holder: holder.into(),
            principal_amount,
            principal_redeemed: Money::ZERO,
            interest_redeemed: Money::ZERO,
        }
    }

    /// A ticket fully withdrawn before lock keeps existing but entitles its
    /// holder to nothing.
    pub fn is_void(&self) -> bool {
        self.principal_amount.is_zero()
    }

    /// Interest and principal currently redeemable against this ticket,
    /// derived from the tranche's share prices net of what this ticket has
    /// already redeemed. Zero while the tranche's drawdown window is open.
    pub fn available_to_withdraw(&self, tranche: &Tranche, now: Timestamp) -> (Money, Money) {
        if tranche.locked_until > now {
            return (Money::ZERO, Money::ZERO);
        }
        let max_interest = money_floor(tranche.interest_share_price * self.principal_amount);
        let max_principal = money_floor(tranche.principal_share_price * self.principal_amount);
        let interest = (max_interest - self.interest_redeemed).max(Money::ZERO);
        let principal = (max_principal - self.principal_redeemed).max(Money::ZERO);
        (interest, principal)
    }

    /// Record a redemption against this ticket.
    pub fn redeem(&mut self, interest: Money, principal: Money) -> TranchePoolResult<()> {
        if self.principal_redeemed + principal > self.principal_amount {
            return Err(TranchePoolError::ExceedsAvailable {
                requested: principal,
                available: self.principal_amount - self.principal_redeemed,
            });
        }
        self.interest_redeemed += interest;
        self.principal_redeemed += principal;
        Ok(())
    }

    /// Shrink the ticket for a pre-lock withdrawal of unlocked capital.
    pub fn reduce_deposit(&mut self, amount: Money) -> TranchePoolResult<()> {
        if amount > self.principal_amount {
            return Err(TranchePoolError::ExceedsAvailable {
                requested: amount,
                available: self.principal_amount,
            });
        }
        self.principal_amount -= amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn tranche_with_prices(interest_sp: Decimal, principal_sp: Decimal) -> Tranche {
        let mut tranche = Tranche::new(2);
        tranche.principal_deposited = dec!(10000);
        tranche.interest_share_price = interest_sp;
        tranche.principal_share_price = principal_sp;
        tranche
    }

    #[test]
    fn test_available_zero_while_drawdown_window_open() {
        let mut tranche = tranche_with_prices(dec!(0.01), Decimal::ONE);
        tranche.locked_until = 5_000;
        let ticket = ClaimTicket::new(0, 0, 2, "alice", dec!(1000));

        assert_eq!(ticket.available_to_withdraw(&tranche, 4_999), (Money::ZERO, Money::ZERO));
        assert_eq!(
            ticket.available_to_withdraw(&tranche, 5_000),
            (dec!(10), dec!(1000))
        );
    }

    #[test]
    fn test_available_nets_out_prior_redemptions() {
        let tranche = tranche_with_prices(dec!(0.01), dec!(0.25));
        let mut ticket = ClaimTicket::new(0, 0, 2, "alice", dec!(1000));
        ticket.redeem(dec!(4), dec!(100)).unwrap();

        let (interest, principal) = ticket.available_to_withdraw(&tranche, 0);
        assert_eq!(interest, dec!(6));
        assert_eq!(principal, dec!(150));
    }

    #[test]
    fn test_redeem_cannot_exceed_principal_amount() {
        let mut ticket = ClaimTicket::new(0, 0, 2, "alice", dec!(1000));
        ticket.redeem(Money::ZERO, dec!(900)).unwrap();
        assert!(ticket.redeem(Money::ZERO, dec!(200)).is_err());
        assert_eq!(ticket.principal_redeemed, dec!(900));
    }

    #[test]
    fn test_pre_lock_reduction_voids_at_zero() {
        let mut ticket = ClaimTicket::new(0, 0, 2, "alice", dec!(1000));
        ticket.reduce_deposit(dec!(400)).unwrap();
        assert_eq!(ticket.principal_amount, dec!(600));
        assert!(!ticket.is_void());

        ticket.reduce_deposit(dec!(600)).unwrap();
        assert!(ticket.is_void());
        assert!(ticket.reduce_deposit(dec!(1)).is_err());
    }
}
