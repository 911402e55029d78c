use serde::{Deserialize, Serialize};

use crate::accrual::interest::interest_and_principal_owed;
use crate::accrual::payment::PaymentAllocation;
use crate::error::TranchePoolError;
use crate::types::{Money, Rate, Timestamp, SECONDS_PER_DAY};
use crate::TranchePoolResult;

/// Immutable loan terms supplied when a credit line is initialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditTerms {
    pub max_limit: Money,
    pub interest_apr: Rate,
    pub late_fee_apr: Rate,
    pub payment_period_in_days: u64,
    pub term_in_days: u64,
    pub principal_grace_period_in_days: u64,
}

impl CreditTerms {
    pub fn validate(&self) -> TranchePoolResult<()> {
        if self.max_limit <= Money::ZERO {
            return Err(TranchePoolError::InvalidInput {
                field: "max_limit".into(),
                reason: "must be positive".into(),
            });
        }
        if self.interest_apr < Rate::ZERO || self.late_fee_apr < Rate::ZERO {
            return Err(TranchePoolError::InvalidInput {
                field: "interest_apr".into(),
                reason: "rates cannot be negative".into(),
            });
        }
        if self.payment_period_in_days == 0 {
            return Err(TranchePoolError::InvalidInput {
                field: "payment_period_in_days".into(),
                reason: "must be at least one day".into(),
            });
        }
        if self.term_in_days == 0 {
            return Err(TranchePoolError::InvalidInput {
                field: "term_in_days".into(),
                reason: "must be at least one day".into(),
            });
        }
        Ok(())
    }
}

/// One credit line per borrower-loan. Created zeroed, initialized once,
/// then mutated only by drawdown, assessment, and payment application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreditLine {
    pub borrower: String,
    pub max_limit: Money,
    /// Current drawable ceiling, fixed at pool lock. Always <= max_limit.
    pub limit: Money,
    /// Outstanding principal.
    pub balance: Money,
    pub interest_apr: Rate,
    pub late_fee_apr: Rate,
    pub payment_period_in_days: u64,
    pub term_in_days: u64,
    pub principal_grace_period_in_days: u64,
    /// Unpaid interest as of the last assessment.
    pub interest_owed: Money,
    /// Unpaid principal as of the last assessment.
    pub principal_owed: Money,
    /// Last timestamp accrual was computed through.
    pub interest_accrued_as_of: Timestamp,
    pub last_full_payment_time: Timestamp,
    pub next_due_time: Timestamp,
    /// Zero until the first drawdown starts the term clock.
    pub term_end_time: Timestamp,
}

impl CreditLine {
    /// Initialize a zeroed credit line exactly once.
    pub fn initialize(&mut self, borrower: impl Into<String>, terms: &CreditTerms) -> TranchePoolResult<()> {
        if self.is_initialized() {
            return Err(TranchePoolError::InvalidInput {
                field: "credit_line".into(),
                reason: "already initialized".into(),
            });
        }
        terms.validate()?;
        self.borrower = borrower.into();
        self.max_limit = terms.max_limit;
        self.interest_apr = terms.interest_apr;
        self.late_fee_apr = terms.late_fee_apr;
        self.payment_period_in_days = terms.payment_period_in_days;
        self.term_in_days = terms.term_in_days;
        self.principal_grace_period_in_days = terms.principal_grace_period_in_days;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        !self.max_limit.is_zero()
    }

    pub fn set_limit(&mut self, limit: Money) {
        self.limit = limit.min(self.max_limit);
    }

    pub fn payment_period_in_seconds(&self) -> u64 {
        self.payment_period_in_days * SECONDS_PER_DAY
    }

    /// Start of the loan term; zero before the first drawdown.
    pub fn term_start_time(&self) -> Timestamp {
        if self.term_end_time == 0 {
            0
        } else {
            self.term_end_time - self.term_in_days * SECONDS_PER_DAY
        }
    }

    /// Draw `amount` of principal. The first draw starts the payment
    /// schedule and the term clock.
    pub fn drawdown(&mut self, amount: Money, now: Timestamp) -> TranchePoolResult<()> {
        if amount <= Money::ZERO {
            return Err(TranchePoolError::InvalidInput {
                field: "amount".into(),
                reason: "drawdown must be positive".into(),
            });
        }
        if self.balance + amount > self.limit {
            return Err(TranchePoolError::ExceedsAvailable {
                requested: amount,
                available: self.limit - self.balance,
            });
        }
        if self.term_end_time == 0 {
            self.term_end_time = now + self.term_in_days * SECONDS_PER_DAY;
            self.next_due_time = now + self.payment_period_in_seconds();
            self.last_full_payment_time = now;
            self.interest_accrued_as_of = now;
        }
        self.balance += amount;
        Ok(())
    }

    /// Checkpoint accrual through `now`, updating the owed amounts and the
    /// payment schedule. Re-assessing with no elapsed time is a no-op.
    pub fn assess(&mut self, now: Timestamp, late_fee_grace_period_in_days: u64) -> (Money, Money) {
        if now <= self.interest_accrued_as_of {
            return (self.interest_owed, self.principal_owed);
        }
        let (interest_owed, principal_owed) =
            interest_and_principal_owed(self, now, late_fee_grace_period_in_days);
        self.interest_owed = interest_owed;
        self.principal_owed = principal_owed;
        self.interest_accrued_as_of = now;
        let period = self.payment_period_in_seconds();
        while self.next_due_time != 0 && self.next_due_time < now {
            self.next_due_time += period;
        }
        (interest_owed, principal_owed)
    }

    /// Apply an allocated payment. Clearing everything owed records a full
    /// payment and resets the lateness clock.
    pub fn apply_payment(&mut self, allocation: &PaymentAllocation, now: Timestamp) {
        self.interest_owed -= allocation.interest_payment;
        self.principal_owed -= allocation.principal_payment;
        self.balance -= allocation.principal_payment + allocation.additional_balance_payment;
        if self.interest_owed.is_zero() && self.principal_owed.is_zero() {
            self.last_full_payment_time = now;
        }
    }

    /// A borrower is late once a full payment period has elapsed since the
    /// last full payment with principal still outstanding.
    pub fn is_late(&self, now: Timestamp) -> bool {
        if self.balance.is_zero() || self.last_full_payment_time == 0 {
            return false;
        }
        now > self.last_full_payment_time + self.payment_period_in_seconds()
    }

    pub fn within_principal_grace_period(&self, now: Timestamp) -> bool {
        let start = self.term_start_time();
        if start == 0 {
            return true;
        }
        now < start + self.principal_grace_period_in_days * SECONDS_PER_DAY
    }

    /// Zero out balance and limit when this line is superseded by a
    /// migration. The record itself is never destroyed.
    pub fn close_out(&mut self) {
        self.balance = Money::ZERO;
        self.limit = Money::ZERO;
        self.interest_owed = Money::ZERO;
        self.principal_owed = Money::ZERO;
    }
}
