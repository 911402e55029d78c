use serde::{Deserialize, Serialize};

use crate::credit::CreditLine;
use crate::error::TranchePoolError;
use crate::types::{
    interest_over, with_metadata, ComputationOutput, Money, Timestamp, SECONDS_PER_DAY,
};
use crate::TranchePoolResult;

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

/// Input for a standalone accrual assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccrualInput {
    pub credit_line: CreditLine,
    /// Ledger time to accrue through.
    pub as_of: Timestamp,
    /// Days after the last full payment before late-fee interest starts.
    pub late_fee_grace_period_in_days: u64,
}

/// Breakdown of an accrual assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccrualOutput {
    /// Total unpaid interest through `as_of` (existing owed plus accrued).
    pub interest_owed: Money,
    /// Total unpaid principal through `as_of`.
    pub principal_owed: Money,
    /// Interest newly accrued at the regular rate over the window.
    pub regular_interest_accrued: Money,
    /// Interest newly accrued at the late-fee rate over the late portion.
    pub late_fee_interest_accrued: Money,
    pub seconds_elapsed: u64,
}

// ---------------------------------------------------------------------------
// Core math
// ---------------------------------------------------------------------------

/// Newly accrued regular and late-fee interest over the window from
/// `credit_line.interest_accrued_as_of` to `as_of`, plus total principal
/// owed. Interest keeps accruing on outstanding balance past the term end;
/// the term end only makes the full principal due.
fn accrued_components(
    credit_line: &CreditLine,
    as_of: Timestamp,
    late_fee_grace_period_in_days: u64,
) -> (Money, Money, Money) {
    if credit_line.balance.is_zero() {
        return (Money::ZERO, Money::ZERO, credit_line.principal_owed);
    }

    let window_start = credit_line.interest_accrued_as_of;
    let seconds = as_of.saturating_sub(window_start);
    let regular = interest_over(credit_line.balance, credit_line.interest_apr, seconds);

    let late_fee = if credit_line.late_fee_apr.is_zero() || credit_line.last_full_payment_time == 0
    {
        Money::ZERO
    } else {
        let late_start = credit_line.last_full_payment_time
            + late_fee_grace_period_in_days * SECONDS_PER_DAY;
        let from = late_start.max(window_start);
        let late_seconds = as_of.saturating_sub(from);
        interest_over(credit_line.balance, credit_line.late_fee_apr, late_seconds)
    };

    let principal_owed = if credit_line.term_end_time != 0 && as_of >= credit_line.term_end_time {
        credit_line.balance
    } else {
        credit_line.principal_owed
    };

    (regular, late_fee, principal_owed)
}

/// Total interest and principal owed through `as_of`.
pub fn interest_and_principal_owed(
    credit_line: &CreditLine,
    as_of: Timestamp,
    late_fee_grace_period_in_days: u64,
) -> (Money, Money) {
    let (regular, late_fee, principal_owed) =
        accrued_components(credit_line, as_of, late_fee_grace_period_in_days);
    (credit_line.interest_owed + regular + late_fee, principal_owed)
}

// ---------------------------------------------------------------------------
// Calculator entry point
// ---------------------------------------------------------------------------

/// Assess a credit line's owed interest and principal as a standalone
/// computation.
pub fn assess_owed(input: &AccrualInput) -> TranchePoolResult<ComputationOutput<AccrualOutput>> {
    let mut warnings: Vec<String> = Vec::new();

    if input.as_of < input.credit_line.interest_accrued_as_of {
        return Err(TranchePoolError::InvalidInput {
            field: "as_of".into(),
            reason: "cannot assess earlier than the last accrual checkpoint".into(),
        });
    }
    if input.credit_line.interest_apr < Money::ZERO {
        return Err(TranchePoolError::InvalidInput {
            field: "interest_apr".into(),
            reason: "cannot be negative".into(),
        });
    }
    if input.credit_line.balance.is_zero() && !input.credit_line.interest_owed.is_zero() {
        warnings.push("Zero balance with residual interest owed; nothing further accrues".into());
    }

    let (regular, late_fee, principal_owed) = accrued_components(
        &input.credit_line,
        input.as_of,
        input.late_fee_grace_period_in_days,
    );

    let output = AccrualOutput {
        interest_owed: input.credit_line.interest_owed + regular + late_fee,
        principal_owed,
        regular_interest_accrued: regular,
        late_fee_interest_accrued: late_fee,
        seconds_elapsed: input
            .as_of
            .saturating_sub(input.credit_line.interest_accrued_as_of),
    };

    Ok(with_metadata(
        "Credit line accrual: simple non-compounding interest, 365-day year",
        &serde_json::json!({
            "as_of": input.as_of,
            "balance": input.credit_line.balance.to_string(),
            "interest_apr": input.credit_line.interest_apr.to_string(),
            "late_fee_apr": input.credit_line.late_fee_apr.to_string(),
            "late_fee_grace_period_in_days": input.late_fee_grace_period_in_days,
        }),
        warnings,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credit::CreditTerms;
    use rust_decimal_macros::dec;

    const T0: Timestamp = 1_000_000;

    fn drawn_line(balance: Money) -> CreditLine {
        let mut line = CreditLine::default();
        line.initialize(
            "borrower",
            &CreditTerms {
                max_limit: dec!(1000000),
                interest_apr: dec!(0.03),
                late_fee_apr: dec!(0.02),
                payment_period_in_days: 30,
                term_in_days: 365,
                principal_grace_period_in_days: 185,
            },
        )
        .unwrap();
        line.set_limit(dec!(1000000));
        line.drawdown(balance, T0).unwrap();
        line
    }

    // -----------------------------------------------------------------------
    // Test 1: known-answer interest over 100 seconds
    // -----------------------------------------------------------------------
    #[test]
    fn test_interest_for_100_seconds() {
        let line = drawn_line(dec!(1000));
        let (interest, principal) = interest_and_principal_owed(&line, T0 + 100, 30);
        // 1000 * 3% * 100 / 31,536,000 seconds
        assert_eq!(interest, dec!(0.000095));
        assert_eq!(principal, Money::ZERO);
    }

    // -----------------------------------------------------------------------
    // Test 2: zero balance accrues nothing regardless of elapsed time
    // -----------------------------------------------------------------------
    #[test]
    fn test_zero_balance_accrues_nothing() {
        let line = CreditLine::default();
        let (interest, principal) =
            interest_and_principal_owed(&line, T0 + 10 * SECONDS_PER_DAY, 30);
        assert_eq!(interest, Money::ZERO);
        assert_eq!(principal, Money::ZERO);
    }

    // -----------------------------------------------------------------------
    // Test 3: principal becomes fully owed at term end
    // -----------------------------------------------------------------------
    #[test]
    fn test_principal_due_at_term_end() {
        let line = drawn_line(dec!(40000));
        let term_end = line.term_end_time;

        let (_, before) = interest_and_principal_owed(&line, term_end - 1, 30);
        assert_eq!(before, Money::ZERO);

        let (_, at) = interest_and_principal_owed(&line, term_end, 30);
        assert_eq!(at, dec!(40000));
    }

    // -----------------------------------------------------------------------
    // Test 4: interest keeps accruing past the term end
    // -----------------------------------------------------------------------
    #[test]
    fn test_interest_continues_after_term_end() {
        let line = drawn_line(dec!(40000));
        let term_end = line.term_end_time;

        let (at_end, _) = interest_and_principal_owed(&line, term_end, 30);
        let (after, _) = interest_and_principal_owed(&line, term_end + 30 * SECONDS_PER_DAY, 30);
        assert!(after > at_end);
    }

    // -----------------------------------------------------------------------
    // Test 5: late fee applies only to the late portion of the window
    // -----------------------------------------------------------------------
    #[test]
    fn test_late_fee_applies_after_grace() {
        let line = drawn_line(dec!(10000));

        // Exactly at the grace boundary: no late fee yet.
        let input = AccrualInput {
            credit_line: line.clone(),
            as_of: T0 + 30 * SECONDS_PER_DAY,
            late_fee_grace_period_in_days: 30,
        };
        let at_boundary = assess_owed(&input).unwrap();
        assert_eq!(at_boundary.result.late_fee_interest_accrued, Money::ZERO);

        // Ten days beyond the grace boundary: late fee on those ten days only.
        let input = AccrualInput {
            credit_line: line,
            as_of: T0 + 40 * SECONDS_PER_DAY,
            late_fee_grace_period_in_days: 30,
        };
        let late = assess_owed(&input).unwrap();
        // 10,000 * 2% * 10/365 = 5.479452 (floored)
        assert_eq!(late.result.late_fee_interest_accrued, dec!(5.479452));
        // Regular interest still covers the full 40 days.
        assert_eq!(late.result.regular_interest_accrued, dec!(32.876712));
    }

    // -----------------------------------------------------------------------
    // Test 6: existing owed interest is carried into the total
    // -----------------------------------------------------------------------
    #[test]
    fn test_existing_owed_carried_forward() {
        let mut line = drawn_line(dec!(10000));
        line.interest_owed = dec!(12.5);
        let (interest, _) = interest_and_principal_owed(&line, T0 + 100, 30);
        assert_eq!(interest, dec!(12.5) + dec!(0.000951));
    }

    // -----------------------------------------------------------------------
    // Test 7: assessing before the checkpoint is rejected
    // -----------------------------------------------------------------------
    #[test]
    fn test_as_of_before_checkpoint_rejected() {
        let line = drawn_line(dec!(10000));
        let input = AccrualInput {
            credit_line: line,
            as_of: T0 - 1,
            late_fee_grace_period_in_days: 30,
        };
        assert!(assess_owed(&input).is_err());
    }
}
