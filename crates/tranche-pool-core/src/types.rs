use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Ledger time in epoch seconds, supplied by the execution substrate.
pub type Timestamp = u64;

/// Arena index of a pool.
pub type PoolId = usize;

/// Arena index of a credit line.
pub type CreditLineId = usize;

/// Arena index of a claim ticket.
pub type TicketId = usize;

/// Tranche id within a pool. Senior tranches are odd, junior tranches even:
/// slice `k` holds senior `2k + 1` and junior `2k + 2`.
pub type TrancheId = u64;

pub const SECONDS_PER_DAY: u64 = 86_400;
pub const DAYS_PER_YEAR: u64 = 365;
pub const SECONDS_PER_YEAR: u64 = SECONDS_PER_DAY * DAYS_PER_YEAR;

/// Decimal places carried by monetary amounts.
pub const MONEY_SCALE: u32 = 6;

/// Decimal places carried by tranche share prices.
pub const SHARE_PRICE_SCALE: u32 = 18;

/// Truncate a monetary amount to its ledger scale (floor toward zero).
pub fn money_floor(amount: Money) -> Money {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::ToZero)
}

/// Round a fee amount away from zero at the ledger scale.
pub fn fee_round(amount: Money) -> Money {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::AwayFromZero)
}

/// Share-price increment produced by crediting `amount` against a tranche
/// with `principal_deposited` units outstanding. Floors the division so a
/// credit can never mint value out of thin air; returns zero when the
/// tranche has no deposits (share prices freeze at zero principal).
pub fn share_price_delta(amount: Money, principal_deposited: Money) -> Decimal {
    if principal_deposited.is_zero() {
        return Decimal::ZERO;
    }
    (amount / principal_deposited).round_dp_with_strategy(SHARE_PRICE_SCALE, RoundingStrategy::ToZero)
}

/// Simple interest on `balance` at annual rate `apr` over `seconds`,
/// truncated to the money scale. Non-compounding, 365-day year.
pub fn interest_over(balance: Money, apr: Rate, seconds: u64) -> Money {
    if balance.is_zero() || apr.is_zero() || seconds == 0 {
        return Decimal::ZERO;
    }
    money_floor(balance * apr * Decimal::from(seconds) / Decimal::from(SECONDS_PER_YEAR))
}

/// Standard computation output envelope for the pure calculators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_floor_truncates_toward_zero() {
        assert_eq!(money_floor(dec!(1.2345678)), dec!(1.234567));
        assert_eq!(money_floor(dec!(1.2345671)), dec!(1.234567));
    }

    #[test]
    fn test_fee_round_away_from_zero() {
        assert_eq!(fee_round(dec!(20.5479452)), dec!(20.547946));
        assert_eq!(fee_round(dec!(20.547945)), dec!(20.547945));
    }

    #[test]
    fn test_share_price_delta_zero_principal_freezes() {
        assert_eq!(share_price_delta(dec!(100), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_share_price_delta_exact_division() {
        assert_eq!(
            share_price_delta(dec!(147.945205), dec!(40000)),
            dec!(0.003698630125)
        );
    }

    #[test]
    fn test_interest_over_known_answer() {
        // $1,000 at 3% APR for 100 seconds: 1000 * 0.03 * 100 / 31,536,000
        assert_eq!(interest_over(dec!(1000), dec!(0.03), 100), dec!(0.000095));
    }

    #[test]
    fn test_interest_over_zero_cases() {
        assert_eq!(interest_over(Decimal::ZERO, dec!(0.05), 86_400), Decimal::ZERO);
        assert_eq!(interest_over(dec!(1000), Decimal::ZERO, 86_400), Decimal::ZERO);
        assert_eq!(interest_over(dec!(1000), dec!(0.05), 0), Decimal::ZERO);
    }

    #[test]
    fn test_interest_over_full_year() {
        // A full year at 5% on $10,000 is exactly $500.
        assert_eq!(
            interest_over(dec!(10000), dec!(0.05), SECONDS_PER_YEAR),
            dec!(500)
        );
    }
}
