use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::credit::CreditLine;
use crate::error::TranchePoolError;
use crate::types::{
    money_floor, with_metadata, ComputationOutput, Money, Rate, Timestamp, SECONDS_PER_DAY,
};
use crate::TranchePoolResult;

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

/// Input for a standalone write-down computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WritedownInput {
    pub credit_line: CreditLine,
    pub as_of: Timestamp,
    /// Days of lateness forgiven before any markdown.
    pub grace_period_in_days: u64,
    /// Payment periods of lateness at which the markdown reaches 100%.
    pub max_late_periods: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WritedownOutput {
    /// Days beyond one payment period plus grace. Zero when not late.
    pub days_late: Decimal,
    /// Fraction of the balance marked down, in [0, 1].
    pub writedown_percent: Rate,
    /// Marked-down amount; never exceeds the outstanding balance.
    pub writedown_amount: Money,
}

// ---------------------------------------------------------------------------
// Core math
// ---------------------------------------------------------------------------

/// Proportional markdown of the outstanding balance for lateness.
///
/// The markdown ramps linearly from zero (at one payment period plus grace
/// since the last full payment) to 100% of the balance (at
/// `max_late_periods` payment periods late), and is capped at the balance.
pub fn writedown_components(
    credit_line: &CreditLine,
    as_of: Timestamp,
    grace_period_in_days: u64,
    max_late_periods: u64,
) -> (Decimal, Rate, Money) {
    if credit_line.balance.is_zero()
        || credit_line.last_full_payment_time == 0
        || credit_line.payment_period_in_days == 0
        || max_late_periods == 0
    {
        return (Decimal::ZERO, Rate::ZERO, Money::ZERO);
    }

    let seconds_since = as_of.saturating_sub(credit_line.last_full_payment_time);
    let days_since = Decimal::from(seconds_since) / Decimal::from(SECONDS_PER_DAY);
    let days_late = days_since
        - Decimal::from(credit_line.payment_period_in_days)
        - Decimal::from(grace_period_in_days);
    if days_late <= Decimal::ZERO {
        return (Decimal::ZERO, Rate::ZERO, Money::ZERO);
    }

    let max_days_late = Decimal::from(max_late_periods * credit_line.payment_period_in_days);
    let percent = (days_late / max_days_late).min(Decimal::ONE);
    let amount = money_floor(credit_line.balance * percent).min(credit_line.balance);

    (days_late, percent, amount)
}

// ---------------------------------------------------------------------------
// Calculator entry point
// ---------------------------------------------------------------------------

pub fn run_writedown(input: &WritedownInput) -> TranchePoolResult<ComputationOutput<WritedownOutput>> {
    if input.max_late_periods == 0 {
        return Err(TranchePoolError::InvalidInput {
            field: "max_late_periods".into(),
            reason: "must be at least one payment period".into(),
        });
    }
    if input.credit_line.payment_period_in_days == 0 {
        return Err(TranchePoolError::InvalidInput {
            field: "payment_period_in_days".into(),
            reason: "must be at least one day".into(),
        });
    }

    let (days_late, percent, amount) = writedown_components(
        &input.credit_line,
        input.as_of,
        input.grace_period_in_days,
        input.max_late_periods,
    );

    let output = WritedownOutput {
        days_late,
        writedown_percent: percent,
        writedown_amount: amount,
    };

    Ok(with_metadata(
        "Write-down: linear markdown of outstanding balance by days late",
        &serde_json::json!({
            "as_of": input.as_of,
            "balance": input.credit_line.balance.to_string(),
            "grace_period_in_days": input.grace_period_in_days,
            "max_late_periods": input.max_late_periods,
        }),
        Vec::new(),
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
