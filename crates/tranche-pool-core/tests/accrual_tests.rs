use rust_decimal::Decimal;
use tranche_pool_core::accrual::{
    assess_owed, run_payment_allocation, run_writedown, AccrualInput, PaymentAllocationInput,
    WritedownInput,
};
use tranche_pool_core::credit::{CreditLine, CreditTerms};
use tranche_pool_core::types::{Timestamp, SECONDS_PER_DAY};

use rust_decimal_macros::dec;

// ===========================================================================
// Accrual calculator tests
// ===========================================================================

const T0: Timestamp = 1_000_000;

fn drawn_line(balance: Decimal, apr: Decimal) -> CreditLine {
    let mut line = CreditLine::default();
    line.initialize(
        "borrower",
        &CreditTerms {
            max_limit: dec!(1000000),
            interest_apr: apr,
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

#[test]
fn test_accrual_100_seconds_known_answer() {
    // $1,000 at 3% APR over 100 seconds of a 365-day year.
    let output = assess_owed(&AccrualInput {
        credit_line: drawn_line(dec!(1000), dec!(0.03)),
        as_of: T0 + 100,
        late_fee_grace_period_in_days: 30,
    })
    .unwrap();

    assert_eq!(output.result.interest_owed, dec!(0.000095));
    assert_eq!(output.result.principal_owed, Decimal::ZERO);
    assert_eq!(output.result.seconds_elapsed, 100);
}

#[test]
fn test_accrual_zero_balance_is_zero() {
    let output = assess_owed(&AccrualInput {
        credit_line: CreditLine::default(),
        as_of: T0 + 500 * SECONDS_PER_DAY,
        late_fee_grace_period_in_days: 30,
    })
    .unwrap();

    assert_eq!(output.result.interest_owed, Decimal::ZERO);
    assert_eq!(output.result.principal_owed, Decimal::ZERO);
}

#[test]
fn test_accrual_term_end_makes_principal_due() {
    let line = drawn_line(dec!(25000), dec!(0.05));
    let term_end = line.term_end_time;

    let output = assess_owed(&AccrualInput {
        credit_line: line,
        as_of: term_end + SECONDS_PER_DAY,
        late_fee_grace_period_in_days: 30,
    })
    .unwrap();

    assert_eq!(output.result.principal_owed, dec!(25000));
    // Interest still accrued past the term end.
    assert!(output.result.regular_interest_accrued > Decimal::ZERO);
}

#[test]
fn test_accrual_outputs_are_non_negative() {
    let cases = [
        (dec!(0.000001), 1u64),
        (dec!(1000), 86_400),
        (dec!(999999), 365 * SECONDS_PER_DAY),
    ];
    for (balance, elapsed) in cases {
        let output = assess_owed(&AccrualInput {
            credit_line: drawn_line(balance, dec!(0.05)),
            as_of: T0 + elapsed,
            late_fee_grace_period_in_days: 30,
        })
        .unwrap();
        assert!(output.result.interest_owed >= Decimal::ZERO);
        assert!(output.result.principal_owed >= Decimal::ZERO);
    }
}

// ===========================================================================
// Payment allocation tests
// ===========================================================================

#[test]
fn test_allocation_40_dollar_example() {
    // $40 against interest 10, principal 20, balance 40.
    let output = run_payment_allocation(&PaymentAllocationInput {
        payment_amount: dec!(40),
        balance: dec!(40),
        interest_owed: dec!(10),
        principal_owed: dec!(20),
    })
    .unwrap();

    assert_eq!(output.result.interest_payment, dec!(10));
    assert_eq!(output.result.principal_payment, dec!(20));
    assert_eq!(output.result.additional_balance_payment, dec!(10));
    assert_eq!(output.result.payment_remainder, Decimal::ZERO);
}

#[test]
fn test_allocation_conserves_every_payment() {
    let payments = [dec!(0.000001), dec!(9.99), dec!(30), dec!(35.5), dec!(1000)];
    for payment in payments {
        let output = run_payment_allocation(&PaymentAllocationInput {
            payment_amount: payment,
            balance: dec!(30),
            interest_owed: dec!(4.25),
            principal_owed: dec!(12),
        })
        .unwrap();
        let a = &output.result;
        assert_eq!(
            a.interest_payment + a.principal_payment + a.additional_balance_payment
                + a.payment_remainder,
            payment
        );
    }
}

// ===========================================================================
// Write-down calculator tests
// ===========================================================================

#[test]
fn test_writedown_ramp_and_cap() {
    let line = drawn_line(dec!(50000), dec!(0.05));

    // 75 days without payment: 15 days late over a 120-day ramp.
    let output = run_writedown(&WritedownInput {
        credit_line: line.clone(),
        as_of: T0 + 75 * SECONDS_PER_DAY,
        grace_period_in_days: 30,
        max_late_periods: 4,
    })
    .unwrap();
    assert_eq!(output.result.writedown_percent, dec!(0.125));
    assert_eq!(output.result.writedown_amount, dec!(6250));

    // Far past the ramp: capped at the full balance.
    let output = run_writedown(&WritedownInput {
        credit_line: line,
        as_of: T0 + 2_000 * SECONDS_PER_DAY,
        grace_period_in_days: 30,
        max_late_periods: 4,
    })
    .unwrap();
    assert_eq!(output.result.writedown_percent, Decimal::ONE);
    assert_eq!(output.result.writedown_amount, dec!(50000));
}

#[test]
fn test_writedown_never_exceeds_balance() {
    for balance in [dec!(0.000001), dec!(1), dec!(123456.789)] {
        let output = run_writedown(&WritedownInput {
            credit_line: drawn_line(balance, dec!(0.05)),
            as_of: T0 + 300 * SECONDS_PER_DAY,
            grace_period_in_days: 30,
            max_late_periods: 4,
        })
        .unwrap();
        assert!(output.result.writedown_amount <= balance);
        assert!(output.result.writedown_amount >= Decimal::ZERO);
    }
}
