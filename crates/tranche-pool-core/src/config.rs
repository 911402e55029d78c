use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::TranchePoolError;
use crate::types::Rate;
use crate::TranchePoolResult;

/// Protocol-wide configuration, passed by handle into every core operation.
///
/// Values that must survive a funding round unchanged (the drawdown window,
/// fee percentages) are read at lock time and baked into per-pool state, so
/// later configuration changes never rewrite history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Share of gross interest skimmed into the protocol reserve.
    pub reserve_fee_percent: Rate,
    /// Share of junior interest diverted to senior tranches.
    pub junior_fee_percent: Rate,
    /// Days after locking during which the borrower may draw down.
    pub drawdown_window_in_days: u64,
    /// Ceiling on funding rounds per pool.
    pub max_slices_per_pool: usize,
    /// Ceiling on any leverage ratio (10x).
    pub max_leverage_ratio: Decimal,
    /// Grace period before late-fee interest starts accruing.
    pub late_fee_grace_period_in_days: u64,
    /// Grace period before lateness marks down the outstanding balance.
    pub writedown_grace_period_in_days: u64,
    /// Payment periods of lateness at which the markdown reaches 100%.
    pub writedown_max_late_periods: u64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            reserve_fee_percent: dec!(0.10),
            junior_fee_percent: dec!(0.20),
            drawdown_window_in_days: 14,
            max_slices_per_pool: 5,
            max_leverage_ratio: dec!(10),
            late_fee_grace_period_in_days: 30,
            writedown_grace_period_in_days: 30,
            writedown_max_late_periods: 4,
        }
    }
}

impl ProtocolConfig {
    pub fn validate(&self) -> TranchePoolResult<()> {
        if self.reserve_fee_percent < Decimal::ZERO || self.reserve_fee_percent >= Decimal::ONE {
            return Err(TranchePoolError::InvalidInput {
                field: "reserve_fee_percent".into(),
                reason: "must be in [0, 1)".into(),
            });
        }
        if self.junior_fee_percent < Decimal::ZERO || self.junior_fee_percent >= Decimal::ONE {
            return Err(TranchePoolError::InvalidInput {
                field: "junior_fee_percent".into(),
                reason: "must be in [0, 1)".into(),
            });
        }
        if self.max_slices_per_pool == 0 {
            return Err(TranchePoolError::InvalidInput {
                field: "max_slices_per_pool".into(),
                reason: "at least one slice is required".into(),
            });
        }
        if self.max_leverage_ratio <= Decimal::ZERO {
            return Err(TranchePoolError::InvalidInput {
                field: "max_leverage_ratio".into(),
                reason: "must be positive".into(),
            });
        }
        if self.writedown_max_late_periods == 0 {
            return Err(TranchePoolError::InvalidInput {
                field: "writedown_max_late_periods".into(),
                reason: "must be at least one payment period".into(),
            });
        }
        Ok(())
    }

    pub fn drawdown_window_in_seconds(&self) -> u64 {
        self.drawdown_window_in_days * crate::types::SECONDS_PER_DAY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ProtocolConfig::default().validate().is_ok());
    }

    #[test]
    fn test_reserve_fee_must_be_a_fraction() {
        let config = ProtocolConfig {
            reserve_fee_percent: dec!(1),
            ..ProtocolConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_slices_rejected() {
        let config = ProtocolConfig {
            max_slices_per_pool: 0,
            ..ProtocolConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_drawdown_window_in_seconds() {
        let config = ProtocolConfig::default();
        assert_eq!(config.drawdown_window_in_seconds(), 14 * 86_400);
    }
}
