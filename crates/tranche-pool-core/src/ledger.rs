use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::accrual::payment::{allocate_payment, PaymentAllocation};
use crate::accrual::writedown::writedown_components;
use crate::claims::ClaimTicket;
use crate::config::ProtocolConfig;
use crate::credit::{CreditLine, CreditTerms};
use crate::error::TranchePoolError;
use crate::gate::{AllowAll, EligibilityGate};
use crate::leverage::{LeverageStrategy, SliceLockState};
use crate::pool::waterfall::{distribute_payment, WaterfallReport};
use crate::pool::{slice_index_of, Slice, TranchedPool};
use crate::types::{
    money_floor, CreditLineId, Money, PoolId, Rate, TicketId, Timestamp, TrancheId,
};
use crate::TranchePoolResult;

// ---------------------------------------------------------------------------
// Public records
// ---------------------------------------------------------------------------

/// Everything needed to open a pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolParams {
    pub borrower: String,
    pub terms: CreditTerms,
    /// Earliest time the first slice accepts deposits.
    pub fundable_at: Timestamp,
    pub strategy: LeverageStrategy,
}

/// What one `pay` call did, end to end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub allocation: PaymentAllocation,
    pub waterfall: WaterfallReport,
}

/// Append-only log of what each successful call changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    PoolCreated {
        pool: PoolId,
        borrower: String,
    },
    DepositMade {
        pool: PoolId,
        tranche: TrancheId,
        ticket: TicketId,
        depositor: String,
        amount: Money,
    },
    WithdrawalMade {
        pool: PoolId,
        ticket: TicketId,
        interest: Money,
        principal: Money,
    },
    JuniorCapitalLocked {
        pool: PoolId,
        locked_until: Timestamp,
    },
    PoolLocked {
        pool: PoolId,
        locked_until: Timestamp,
        limit: Money,
    },
    SliceInitialized {
        pool: PoolId,
        slice: usize,
        fundable_at: Timestamp,
    },
    DrawdownMade {
        pool: PoolId,
        amount: Money,
    },
    PaymentApplied {
        pool: PoolId,
        interest: Money,
        principal: Money,
        additional_balance: Money,
        remainder: Money,
        reserve_fee: Money,
    },
    InvestmentMade {
        pool: PoolId,
        ticket: TicketId,
        amount: Money,
    },
    LeverageRatioSet {
        pool: PoolId,
        ratio: Decimal,
        junior_locked_until: Timestamp,
    },
    WritedownAssessed {
        pool: PoolId,
        amount: Money,
        percent: Rate,
    },
    CreditLineMigrated {
        pool: PoolId,
        old: CreditLineId,
        new: CreditLineId,
    },
}

// ---------------------------------------------------------------------------
// The ledger
// ---------------------------------------------------------------------------

/// The whole protocol state: arena-allocated pools, credit lines, and claim
/// tickets, addressed by stable integer ids and mutated only through the
/// operations below. Every operation validates all of its preconditions
/// before its first mutation, so a failed call leaves state untouched.
#[derive(Debug)]
pub struct LendingLedger {
    config: ProtocolConfig,
    gate: Box<dyn EligibilityGate>,
    pools: Vec<TranchedPool>,
    credit_lines: Vec<CreditLine>,
    tickets: Vec<ClaimTicket>,
    reserve_balance: Money,
    events: Vec<LedgerEvent>,
}

impl LendingLedger {
    pub fn new(config: ProtocolConfig) -> TranchePoolResult<Self> {
        Self::with_gate(config, Box::new(AllowAll))
    }

    pub fn with_gate(
        config: ProtocolConfig,
        gate: Box<dyn EligibilityGate>,
    ) -> TranchePoolResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            gate,
            pools: Vec::new(),
            credit_lines: Vec::new(),
            tickets: Vec::new(),
            reserve_balance: Money::ZERO,
            events: Vec::new(),
        })
    }

    // -- accessors ----------------------------------------------------------

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn pool(&self, pool: PoolId) -> TranchePoolResult<&TranchedPool> {
        self.pools.get(pool).ok_or(TranchePoolError::UnknownId {
            kind: "pool",
            id: pool as u64,
        })
    }

    pub fn pools(&self) -> &[TranchedPool] {
        &self.pools
    }

    pub fn credit_line(&self, id: CreditLineId) -> TranchePoolResult<&CreditLine> {
        self.credit_lines
            .get(id)
            .ok_or(TranchePoolError::UnknownId {
                kind: "credit line",
                id: id as u64,
            })
    }

    pub fn credit_lines(&self) -> &[CreditLine] {
        &self.credit_lines
    }

    pub fn credit_line_for(&self, pool: PoolId) -> TranchePoolResult<&CreditLine> {
        let pool = self.pool(pool)?;
        self.credit_line(pool.credit_line)
    }

    pub fn ticket(&self, id: TicketId) -> TranchePoolResult<&ClaimTicket> {
        self.tickets.get(id).ok_or(TranchePoolError::UnknownId {
            kind: "ticket",
            id: id as u64,
        })
    }

    pub fn tickets(&self) -> &[ClaimTicket] {
        &self.tickets
    }

    pub fn reserve_balance(&self) -> Money {
        self.reserve_balance
    }

    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Interest and principal currently redeemable against a ticket.
    pub fn available_to_withdraw(
        &self,
        ticket: TicketId,
        now: Timestamp,
    ) -> TranchePoolResult<(Money, Money)> {
        let ticket = self.ticket(ticket)?;
        let pool = self.pool(ticket.pool)?;
        let tranche = pool.tranche(ticket.tranche)?;
        if !tranche.is_locked() {
            return Ok((Money::ZERO, ticket.principal_amount));
        }
        Ok(ticket.available_to_withdraw(tranche, now))
    }

    // -- pool setup ---------------------------------------------------------

    pub fn create_pool(&mut self, params: PoolParams) -> TranchePoolResult<PoolId> {
        params.terms.validate()?;
        let credit_line_id = self.credit_lines.len();
        let mut credit_line = CreditLine::default();
        credit_line.initialize(params.borrower.clone(), &params.terms)?;
        self.credit_lines.push(credit_line);

        let pool_id = self.pools.len();
        self.pools.push(TranchedPool::new(
            pool_id,
            params.borrower.clone(),
            credit_line_id,
            params.strategy,
            params.fundable_at,
        ));
        self.events.push(LedgerEvent::PoolCreated {
            pool: pool_id,
            borrower: params.borrower,
        });
        Ok(pool_id)
    }

    // -- deposits and withdrawals -------------------------------------------

    pub fn deposit(
        &mut self,
        pool: PoolId,
        tranche: TrancheId,
        amount: Money,
        caller: &str,
        now: Timestamp,
    ) -> TranchePoolResult<TicketId> {
        {
            let pool = self.pool(pool)?;
            if !self.gate.is_permitted(caller) {
                return Err(TranchePoolError::NotAuthorized {
                    address: caller.into(),
                    operation: "deposit".into(),
                });
            }
            if amount <= Money::ZERO {
                return Err(TranchePoolError::InvalidInput {
                    field: "amount".into(),
                    reason: "deposit must be positive".into(),
                });
            }
            let target = pool.tranche(tranche)?;
            if target.is_locked() {
                return Err(TranchePoolError::TrancheLocked { tranche });
            }
            let slice = &pool.slices[slice_index_of(tranche)];
            if now < slice.fundable_at {
                return Err(TranchePoolError::NotOpenForFunding {
                    tranche,
                    fundable_at: slice.fundable_at,
                });
            }
        }

        self.pools[pool].tranche_mut(tranche)?.principal_deposited += amount;
        let ticket = self.mint_ticket(pool, tranche, caller, amount);
        self.events.push(LedgerEvent::DepositMade {
            pool,
            tranche,
            ticket,
            depositor: caller.into(),
            amount,
        });
        Ok(ticket)
    }

    pub fn withdraw(
        &mut self,
        ticket: TicketId,
        amount: Money,
        caller: &str,
        now: Timestamp,
    ) -> TranchePoolResult<(Money, Money)> {
        if amount <= Money::ZERO {
            return Err(TranchePoolError::InvalidInput {
                field: "amount".into(),
                reason: "withdrawal must be positive".into(),
            });
        }
        self.withdraw_inner(ticket, Some(amount), caller, now)
    }

    /// Withdraw everything currently redeemable against a ticket.
    pub fn withdraw_max(
        &mut self,
        ticket: TicketId,
        caller: &str,
        now: Timestamp,
    ) -> TranchePoolResult<(Money, Money)> {
        self.withdraw_inner(ticket, None, caller, now)
    }

    /// Withdraw against several tickets in one call. Validates everything
    /// before mutating anything so the batch stays atomic.
    pub fn withdraw_multiple(
        &mut self,
        tickets: &[TicketId],
        amounts: &[Money],
        caller: &str,
        now: Timestamp,
    ) -> TranchePoolResult<Vec<(Money, Money)>> {
        if tickets.len() != amounts.len() {
            return Err(TranchePoolError::MismatchedBatch {
                ids: tickets.len(),
                amounts: amounts.len(),
            });
        }
        for (i, ticket) in tickets.iter().enumerate() {
            if tickets[..i].contains(ticket) {
                return Err(TranchePoolError::InvalidInput {
                    field: "tickets".into(),
                    reason: format!("ticket {ticket} appears more than once"),
                });
            }
        }
        for (&ticket, &amount) in tickets.iter().zip(amounts) {
            if amount <= Money::ZERO {
                return Err(TranchePoolError::InvalidInput {
                    field: "amounts".into(),
                    reason: "withdrawals must be positive".into(),
                });
            }
            let (_, interest, principal) = self.withdrawable(ticket, caller, now, "withdraw")?;
            if amount > interest + principal {
                return Err(TranchePoolError::ExceedsAvailable {
                    requested: amount,
                    available: interest + principal,
                });
            }
        }

        tickets
            .iter()
            .zip(amounts)
            .map(|(&ticket, &amount)| self.withdraw_inner(ticket, Some(amount), caller, now))
            .collect()
    }

    /// Availability for a withdrawal, after every authorization check.
    /// Returns `(locked, interest, principal)`.
    fn withdrawable(
        &self,
        ticket: TicketId,
        caller: &str,
        now: Timestamp,
        operation: &str,
    ) -> TranchePoolResult<(bool, Money, Money)> {
        let ticket = self.ticket(ticket)?;
        if !self.gate.is_permitted(caller) || ticket.holder != caller {
            return Err(TranchePoolError::NotAuthorized {
                address: caller.into(),
                operation: operation.into(),
            });
        }
        let pool = self.pool(ticket.pool)?;
        let tranche = pool.tranche(ticket.tranche)?;
        if !tranche.is_locked() {
            Ok((false, Money::ZERO, ticket.principal_amount))
        } else {
            let (interest, principal) = ticket.available_to_withdraw(tranche, now);
            Ok((true, interest, principal))
        }
    }

    fn withdraw_inner(
        &mut self,
        ticket: TicketId,
        amount: Option<Money>,
        caller: &str,
        now: Timestamp,
    ) -> TranchePoolResult<(Money, Money)> {
        let (locked, interest_available, principal_available) =
            self.withdrawable(ticket, caller, now, "withdraw")?;
        let total_available = interest_available + principal_available;
        let amount = amount.unwrap_or(total_available);
        if amount > total_available {
            return Err(TranchePoolError::ExceedsAvailable {
                requested: amount,
                available: total_available,
            });
        }
        if amount.is_zero() {
            return Ok((Money::ZERO, Money::ZERO));
        }

        let (pool_id, tranche_id) = {
            let ticket = &self.tickets[ticket];
            (ticket.pool, ticket.tranche)
        };
        let (interest, principal) = if locked {
            let interest = amount.min(interest_available);
            let principal = amount - interest;
            self.tickets[ticket].redeem(interest, principal)?;
            (interest, principal)
        } else {
            // Unlocked capital leaves the tranche and shrinks the ticket.
            self.pools[pool_id]
                .tranche_mut(tranche_id)?
                .principal_deposited -= amount;
            self.tickets[ticket].reduce_deposit(amount)?;
            (Money::ZERO, amount)
        };

        self.events.push(LedgerEvent::WithdrawalMade {
            pool: pool_id,
            ticket,
            interest,
            principal,
        });
        Ok((interest, principal))
    }

    // -- locking and slices -------------------------------------------------

    pub fn lock_junior_capital(
        &mut self,
        pool: PoolId,
        caller: &str,
        now: Timestamp,
    ) -> TranchePoolResult<()> {
        self.require_borrower(pool, caller, "lock junior capital")?;
        let locked_until = now + self.config.drawdown_window_in_seconds();
        self.pools[pool].current_slice_mut().junior.lock(locked_until)?;
        self.events.push(LedgerEvent::JuniorCapitalLocked {
            pool,
            locked_until,
        });
        Ok(())
    }

    /// Lock the senior side, synchronize both lock times, and fix the
    /// credit line's limit to everything deposited (capped at max).
    pub fn lock_pool(&mut self, pool: PoolId, caller: &str, now: Timestamp) -> TranchePoolResult<()> {
        self.require_borrower(pool, caller, "lock pool")?;
        {
            let slice = self.pools[pool].current_slice();
            if !slice.junior.is_locked() {
                return Err(TranchePoolError::JuniorNotLocked);
            }
            if slice.senior.is_locked() {
                return Err(TranchePoolError::AlreadyLocked {
                    tranche: slice.senior.id,
                });
            }
        }

        let locked_until = now + self.config.drawdown_window_in_seconds();
        let total_deposited = self.pools[pool].total_deposited();
        {
            let slice = self.pools[pool].current_slice_mut();
            slice.senior.lock(locked_until)?;
            slice.junior.locked_until = locked_until;
        }
        let credit_line_id = self.pools[pool].credit_line;
        self.credit_lines[credit_line_id].set_limit(total_deposited);
        let limit = self.credit_lines[credit_line_id].limit;

        self.events.push(LedgerEvent::PoolLocked {
            pool,
            locked_until,
            limit,
        });
        Ok(())
    }

    /// Open the next funding round once the current one is locked and the
    /// borrower is in good standing.
    pub fn initialize_next_slice(
        &mut self,
        pool: PoolId,
        fundable_at: Timestamp,
        caller: &str,
        now: Timestamp,
    ) -> TranchePoolResult<usize> {
        self.require_borrower(pool, caller, "initialize next slice")?;
        if !self.pools[pool].current_slice().is_locked() {
            return Err(TranchePoolError::SliceStillOpen);
        }
        if self.pools[pool].slices.len() >= self.config.max_slices_per_pool {
            return Err(TranchePoolError::SliceLimitReached {
                max: self.config.max_slices_per_pool,
            });
        }
        let credit_line = &self.credit_lines[self.pools[pool].credit_line];
        if credit_line.is_late(now) {
            return Err(TranchePoolError::BorrowerLate);
        }
        if !credit_line.within_principal_grace_period(now) {
            return Err(TranchePoolError::BeyondPrincipalGracePeriod);
        }

        let index = self.pools[pool].slices.len();
        self.pools[pool].slices.push(Slice::new(index, fundable_at));
        self.events.push(LedgerEvent::SliceInitialized {
            pool,
            slice: index,
            fundable_at,
        });
        Ok(index)
    }

    // -- borrower operations ------------------------------------------------

    pub fn drawdown(
        &mut self,
        pool: PoolId,
        amount: Money,
        caller: &str,
        now: Timestamp,
    ) -> TranchePoolResult<()> {
        self.require_borrower(pool, caller, "drawdown")?;
        if amount <= Money::ZERO {
            return Err(TranchePoolError::InvalidInput {
                field: "amount".into(),
                reason: "drawdown must be positive".into(),
            });
        }
        {
            let pool = &self.pools[pool];
            if !pool.is_locked() {
                return Err(TranchePoolError::PoolNotLocked);
            }
            let window_end = pool.current_slice().senior.locked_until;
            if now > window_end {
                return Err(TranchePoolError::DrawdownWindowClosed {
                    closed_at: window_end,
                });
            }
            let undrawn = pool.total_undrawn();
            if amount > undrawn {
                return Err(TranchePoolError::ExceedsAvailable {
                    requested: amount,
                    available: undrawn,
                });
            }
            let credit_line = &self.credit_lines[pool.credit_line];
            if credit_line.balance + amount > credit_line.limit {
                return Err(TranchePoolError::ExceedsAvailable {
                    requested: amount,
                    available: credit_line.limit - credit_line.balance,
                });
            }
        }

        let credit_line_id = self.pools[pool].credit_line;
        let grace = self.config.late_fee_grace_period_in_days;
        // Checkpoint accrual against the old balance before it grows.
        self.credit_lines[credit_line_id].assess(now, grace);
        self.credit_lines[credit_line_id].drawdown(amount, now)?;
        self.pools[pool].drawdown_principal(amount)?;

        self.events.push(LedgerEvent::DrawdownMade { pool, amount });
        Ok(())
    }

    /// Recompute what the borrower owes as of `now`.
    pub fn assess(&mut self, pool: PoolId, now: Timestamp) -> TranchePoolResult<(Money, Money)> {
        let credit_line_id = self.pool(pool)?.credit_line;
        let grace = self.config.late_fee_grace_period_in_days;
        Ok(self.credit_lines[credit_line_id].assess(now, grace))
    }

    /// Apply a borrower payment: assess, split by strict priority, update
    /// the credit line, then run the waterfall across every slice.
    pub fn pay(
        &mut self,
        pool: PoolId,
        amount: Money,
        now: Timestamp,
    ) -> TranchePoolResult<PaymentReceipt> {
        let credit_line_id = self.pool(pool)?.credit_line;
        if amount <= Money::ZERO {
            return Err(TranchePoolError::InvalidInput {
                field: "amount".into(),
                reason: "payment must be positive".into(),
            });
        }

        let grace = self.config.late_fee_grace_period_in_days;
        let (interest_owed, principal_owed) = self.credit_lines[credit_line_id].assess(now, grace);
        let balance = self.credit_lines[credit_line_id].balance;
        let allocation = allocate_payment(amount, balance, interest_owed, principal_owed);
        self.credit_lines[credit_line_id].apply_payment(&allocation, now);

        let principal_applied = allocation.principal_payment + allocation.additional_balance_payment;
        let waterfall = distribute_payment(
            &mut self.pools[pool],
            allocation.interest_payment,
            principal_applied,
            interest_owed,
            &self.config,
        );
        self.reserve_balance += waterfall.reserve_fee;

        self.events.push(LedgerEvent::PaymentApplied {
            pool,
            interest: allocation.interest_payment,
            principal: allocation.principal_payment,
            additional_balance: allocation.additional_balance_payment,
            remainder: allocation.payment_remainder,
            reserve_fee: waterfall.reserve_fee,
        });
        Ok(PaymentReceipt {
            allocation,
            waterfall,
        })
    }

    // -- leverage and the senior-pool surface -------------------------------

    /// Record a dynamic leverage ratio for the current lock cycle.
    pub fn set_leverage_ratio(
        &mut self,
        pool: PoolId,
        ratio: Decimal,
        junior_locked_until: Timestamp,
    ) -> TranchePoolResult<()> {
        let lock_state = {
            let slice = self.pool(pool)?.current_slice();
            SliceLockState {
                junior_locked_until: slice.junior.locked_until,
                senior_locked: slice.senior.is_locked(),
            }
        };
        let max_ratio = self.config.max_leverage_ratio;
        match &mut self.pools[pool].strategy {
            LeverageStrategy::Dynamic(dynamic) => {
                dynamic.set_ratio(pool, lock_state, ratio, junior_locked_until, max_ratio)?
            }
            LeverageStrategy::Fixed(_) => {
                return Err(TranchePoolError::InvalidInput {
                    field: "strategy".into(),
                    reason: "fixed-ratio pools do not accept per-pool ratios".into(),
                })
            }
        }
        self.events.push(LedgerEvent::LeverageRatioSet {
            pool,
            ratio,
            junior_locked_until,
        });
        Ok(())
    }

    /// Senior capital the pool's strategy currently calls for.
    pub fn estimate_investment(&self, pool: PoolId) -> TranchePoolResult<Money> {
        let pool = self.pool(pool)?;
        pool.strategy.estimate_investment(pool)
    }

    /// Deposit the strategy-sized senior investment into the current
    /// slice's senior tranche. Driven by the aggregating senior pool.
    pub fn invest(&mut self, pool: PoolId, caller: &str) -> TranchePoolResult<TicketId> {
        let (amount, senior_tranche) = {
            let pool = self.pool(pool)?;
            if !self.gate.is_permitted(caller) {
                return Err(TranchePoolError::NotAuthorized {
                    address: caller.into(),
                    operation: "invest".into(),
                });
            }
            let slice = pool.current_slice();
            if !slice.junior.is_locked() {
                return Err(TranchePoolError::JuniorNotLocked);
            }
            if slice.senior.is_locked() {
                return Err(TranchePoolError::SeniorAlreadyLocked);
            }
            let amount = pool.strategy.estimate_investment(pool)?;
            if amount.is_zero() {
                return Err(TranchePoolError::InvalidInput {
                    field: "investment".into(),
                    reason: "strategy calls for no additional senior capital".into(),
                });
            }
            (amount, slice.senior.id)
        };

        self.pools[pool]
            .tranche_mut(senior_tranche)?
            .principal_deposited += amount;
        let ticket = self.mint_ticket(pool, senior_tranche, caller, amount);
        self.events.push(LedgerEvent::InvestmentMade {
            pool,
            ticket,
            amount,
        });
        Ok(ticket)
    }

    /// Withdraw everything a ticket is owed. Driven by the aggregating
    /// senior pool.
    pub fn redeem(
        &mut self,
        ticket: TicketId,
        caller: &str,
        now: Timestamp,
    ) -> TranchePoolResult<(Money, Money)> {
        self.withdraw_inner(ticket, None, caller, now)
    }

    /// Assess and record the pool's current loss markdown.
    pub fn assess_writedown(&mut self, pool: PoolId, now: Timestamp) -> TranchePoolResult<Money> {
        let credit_line_id = self.pool(pool)?.credit_line;
        let (_, percent, amount) = writedown_components(
            &self.credit_lines[credit_line_id],
            now,
            self.config.writedown_grace_period_in_days,
            self.config.writedown_max_late_periods,
        );
        let pool_state = &mut self.pools[pool];
        pool_state.writedown_percent = percent;
        pool_state.writedown_amount = amount;
        self.events.push(LedgerEvent::WritedownAssessed {
            pool,
            amount,
            percent,
        });
        Ok(amount)
    }

    /// A ticket's proportional share of its pool's assessed markdown.
    pub fn writedown_of(&self, ticket: TicketId) -> TranchePoolResult<Money> {
        let ticket = self.ticket(ticket)?;
        let pool = self.pool(ticket.pool)?;
        let unredeemed = ticket.principal_amount - ticket.principal_redeemed;
        Ok(money_floor(unredeemed * pool.writedown_percent))
    }

    // -- migration ----------------------------------------------------------

    /// Supersede a pool's credit line with fresh terms. The replacement
    /// carries over the borrower's accrual state; the old record keeps
    /// existing with balance and limit zeroed.
    pub fn migrate_credit_line(
        &mut self,
        pool: PoolId,
        terms: CreditTerms,
    ) -> TranchePoolResult<CreditLineId> {
        let old_id = self.pool(pool)?.credit_line;
        terms.validate()?;

        let old = self.credit_lines[old_id].clone();
        let mut fresh = CreditLine::default();
        fresh.initialize(old.borrower.clone(), &terms)?;
        fresh.balance = old.balance;
        fresh.interest_owed = old.interest_owed;
        fresh.principal_owed = old.principal_owed;
        fresh.interest_accrued_as_of = old.interest_accrued_as_of;
        fresh.last_full_payment_time = old.last_full_payment_time;
        fresh.next_due_time = old.next_due_time;
        fresh.term_end_time = old.term_end_time;
        fresh.limit = old.limit.min(terms.max_limit);

        let new_id = self.credit_lines.len();
        self.credit_lines.push(fresh);
        self.credit_lines[old_id].close_out();
        self.pools[pool].credit_line = new_id;

        self.events.push(LedgerEvent::CreditLineMigrated {
            pool,
            old: old_id,
            new: new_id,
        });
        Ok(new_id)
    }

    // -- internals ----------------------------------------------------------

    fn require_borrower(
        &self,
        pool: PoolId,
        caller: &str,
        operation: &str,
    ) -> TranchePoolResult<()> {
        let pool = self.pool(pool)?;
        if pool.borrower != caller {
            return Err(TranchePoolError::NotAuthorized {
                address: caller.into(),
                operation: operation.into(),
            });
        }
        Ok(())
    }

    fn mint_ticket(
        &mut self,
        pool: PoolId,
        tranche: TrancheId,
        holder: &str,
        amount: Money,
    ) -> TicketId {
        let id = self.tickets.len();
        self.tickets
            .push(ClaimTicket::new(id, pool, tranche, holder, amount));
        id
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::AllowList;
    use crate::leverage::FixedLeverageRatio;
    use rust_decimal_macros::dec;

    const T0: Timestamp = 1_000_000;

    fn standard_params() -> PoolParams {
        PoolParams {
            borrower: "bob".into(),
            terms: CreditTerms {
                max_limit: dec!(100000),
                interest_apr: dec!(0.05),
                late_fee_apr: dec!(0.02),
                payment_period_in_days: 30,
                term_in_days: 365,
                principal_grace_period_in_days: 185,
            },
            fundable_at: T0,
            strategy: LeverageStrategy::Fixed(FixedLeverageRatio::new(dec!(4)).unwrap()),
        }
    }

    fn ledger() -> LendingLedger {
        LendingLedger::new(ProtocolConfig::default()).unwrap()
    }

    // -----------------------------------------------------------------------
    // Authorization
    // -----------------------------------------------------------------------

    #[test]
    fn test_deposit_requires_permission() {
        let gate = AllowList::new(["alice"]);
        let mut ledger =
            LendingLedger::with_gate(ProtocolConfig::default(), Box::new(gate)).unwrap();
        let pool = ledger.create_pool(standard_params()).unwrap();

        assert!(ledger.deposit(pool, 2, dec!(100), "alice", T0).is_ok());
        let err = ledger.deposit(pool, 2, dec!(100), "mallory", T0).unwrap_err();
        assert!(matches!(err, TranchePoolError::NotAuthorized { .. }));
    }

    #[test]
    fn test_only_borrower_locks_and_draws() {
        let mut ledger = ledger();
        let pool = ledger.create_pool(standard_params()).unwrap();
        ledger.deposit(pool, 2, dec!(1000), "alice", T0).unwrap();

        assert!(matches!(
            ledger.lock_junior_capital(pool, "alice", T0),
            Err(TranchePoolError::NotAuthorized { .. })
        ));
        ledger.lock_junior_capital(pool, "bob", T0).unwrap();
    }

    #[test]
    fn test_withdraw_requires_ticket_holder() {
        let mut ledger = ledger();
        let pool = ledger.create_pool(standard_params()).unwrap();
        let ticket = ledger.deposit(pool, 2, dec!(1000), "alice", T0).unwrap();

        let err = ledger.withdraw(ticket, dec!(100), "mallory", T0).unwrap_err();
        assert!(matches!(err, TranchePoolError::NotAuthorized { .. }));
    }

    // -----------------------------------------------------------------------
    // Deposit validation
    // -----------------------------------------------------------------------

    #[test]
    fn test_zero_deposit_rejected() {
        let mut ledger = ledger();
        let pool = ledger.create_pool(standard_params()).unwrap();
        assert!(matches!(
            ledger.deposit(pool, 2, Money::ZERO, "alice", T0),
            Err(TranchePoolError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_unknown_tranche_rejected() {
        let mut ledger = ledger();
        let pool = ledger.create_pool(standard_params()).unwrap();
        assert!(matches!(
            ledger.deposit(pool, 9, dec!(100), "alice", T0),
            Err(TranchePoolError::UnknownId { .. })
        ));
    }

    #[test]
    fn test_deposit_into_locked_tranche_rejected() {
        let mut ledger = ledger();
        let pool = ledger.create_pool(standard_params()).unwrap();
        ledger.deposit(pool, 2, dec!(1000), "alice", T0).unwrap();
        ledger.lock_junior_capital(pool, "bob", T0).unwrap();

        assert!(matches!(
            ledger.deposit(pool, 2, dec!(100), "alice", T0),
            Err(TranchePoolError::TrancheLocked { tranche: 2 })
        ));
    }

    #[test]
    fn test_deposit_before_fundable_at_rejected() {
        let mut ledger = ledger();
        let mut params = standard_params();
        params.fundable_at = T0 + 1_000;
        let pool = ledger.create_pool(params).unwrap();

        assert!(matches!(
            ledger.deposit(pool, 2, dec!(100), "alice", T0),
            Err(TranchePoolError::NotOpenForFunding { .. })
        ));
        assert!(ledger.deposit(pool, 2, dec!(100), "alice", T0 + 1_000).is_ok());
    }

    // -----------------------------------------------------------------------
    // Locking
    // -----------------------------------------------------------------------

    #[test]
    fn test_double_junior_lock_fails() {
        let mut ledger = ledger();
        let pool = ledger.create_pool(standard_params()).unwrap();
        ledger.lock_junior_capital(pool, "bob", T0).unwrap();
        assert!(matches!(
            ledger.lock_junior_capital(pool, "bob", T0 + 10),
            Err(TranchePoolError::AlreadyLocked { tranche: 2 })
        ));
    }

    #[test]
    fn test_lock_pool_requires_junior_locked() {
        let mut ledger = ledger();
        let pool = ledger.create_pool(standard_params()).unwrap();
        assert!(matches!(
            ledger.lock_pool(pool, "bob", T0),
            Err(TranchePoolError::JuniorNotLocked)
        ));
    }

    #[test]
    fn test_lock_pool_synchronizes_and_sets_limit() {
        let mut ledger = ledger();
        let pool = ledger.create_pool(standard_params()).unwrap();
        ledger.deposit(pool, 2, dec!(10000), "alice", T0).unwrap();
        ledger.lock_junior_capital(pool, "bob", T0).unwrap();
        ledger.invest(pool, "senior-pool").unwrap();
        ledger.lock_pool(pool, "bob", T0 + 100).unwrap();

        let slice = &ledger.pool(pool).unwrap().slices[0];
        assert_eq!(slice.junior.locked_until, slice.senior.locked_until);
        assert_eq!(ledger.credit_line_for(pool).unwrap().limit, dec!(50000));
    }

    // -----------------------------------------------------------------------
    // Batch withdrawal
    // -----------------------------------------------------------------------

    #[test]
    fn test_withdraw_multiple_rejects_mismatched_lengths() {
        let mut ledger = ledger();
        let pool = ledger.create_pool(standard_params()).unwrap();
        let ticket = ledger.deposit(pool, 2, dec!(1000), "alice", T0).unwrap();

        let err = ledger
            .withdraw_multiple(&[ticket], &[dec!(100), dec!(100)], "alice", T0)
            .unwrap_err();
        assert!(matches!(
            err,
            TranchePoolError::MismatchedBatch { ids: 1, amounts: 2 }
        ));
    }

    #[test]
    fn test_withdraw_multiple_is_atomic() {
        let mut ledger = ledger();
        let pool = ledger.create_pool(standard_params()).unwrap();
        let first = ledger.deposit(pool, 2, dec!(1000), "alice", T0).unwrap();
        let second = ledger.deposit(pool, 2, dec!(500), "alice", T0).unwrap();

        // Second amount exceeds availability: nothing at all may move.
        let err = ledger
            .withdraw_multiple(&[first, second], &[dec!(100), dec!(600)], "alice", T0)
            .unwrap_err();
        assert!(matches!(err, TranchePoolError::ExceedsAvailable { .. }));
        assert_eq!(ledger.ticket(first).unwrap().principal_amount, dec!(1000));
        assert_eq!(
            ledger.pool(pool).unwrap().tranche(2).unwrap().principal_deposited,
            dec!(1500)
        );
    }

    // -----------------------------------------------------------------------
    // Pre-lock withdrawal
    // -----------------------------------------------------------------------

    #[test]
    fn test_pre_lock_withdrawal_shrinks_deposit() {
        let mut ledger = ledger();
        let pool = ledger.create_pool(standard_params()).unwrap();
        let ticket = ledger.deposit(pool, 2, dec!(1000), "alice", T0).unwrap();

        let (interest, principal) = ledger.withdraw(ticket, dec!(400), "alice", T0).unwrap();
        assert_eq!(interest, Money::ZERO);
        assert_eq!(principal, dec!(400));
        assert_eq!(ledger.ticket(ticket).unwrap().principal_amount, dec!(600));
        assert_eq!(
            ledger.pool(pool).unwrap().tranche(2).unwrap().principal_deposited,
            dec!(600)
        );
    }

    #[test]
    fn test_nothing_withdrawable_during_drawdown_window() {
        let mut ledger = ledger();
        let pool = ledger.create_pool(standard_params()).unwrap();
        let ticket = ledger.deposit(pool, 2, dec!(1000), "alice", T0).unwrap();
        ledger.lock_junior_capital(pool, "bob", T0).unwrap();

        let err = ledger.withdraw(ticket, dec!(1), "alice", T0 + 1).unwrap_err();
        assert!(matches!(
            err,
            TranchePoolError::ExceedsAvailable { available, .. } if available == Money::ZERO
        ));
    }

    // -----------------------------------------------------------------------
    // Migration
    // -----------------------------------------------------------------------

    #[test]
    fn test_migration_zeroes_old_line() {
        let mut ledger = ledger();
        let pool = ledger.create_pool(standard_params()).unwrap();
        let old_id = ledger.pool(pool).unwrap().credit_line;

        let mut new_terms = standard_params().terms;
        new_terms.interest_apr = dec!(0.08);
        let new_id = ledger.migrate_credit_line(pool, new_terms).unwrap();

        assert_ne!(old_id, new_id);
        assert_eq!(ledger.pool(pool).unwrap().credit_line, new_id);
        assert_eq!(ledger.credit_line(old_id).unwrap().balance, Money::ZERO);
        assert_eq!(ledger.credit_line(old_id).unwrap().limit, Money::ZERO);
        assert_eq!(ledger.credit_line(new_id).unwrap().interest_apr, dec!(0.08));
    }
}
