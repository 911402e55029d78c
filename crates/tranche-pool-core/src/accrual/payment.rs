use serde::{Deserialize, Serialize};

use crate::error::TranchePoolError;
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::TranchePoolResult;

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

/// Input for a standalone payment-allocation computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentAllocationInput {
    pub payment_amount: Money,
    pub balance: Money,
    pub interest_owed: Money,
    pub principal_owed: Money,
}

/// Strict-priority split of a single payment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentAllocation {
    /// Applied against interest owed.
    pub interest_payment: Money,
    /// Applied against principal owed.
    pub principal_payment: Money,
    /// Early/extra principal paydown beyond what is currently owed.
    pub additional_balance_payment: Money,
    /// Anything beyond the full outstanding balance; refunded by the
    /// caller, never silently dropped.
    pub payment_remainder: Money,
}

impl PaymentAllocation {
    pub fn total_applied(&self) -> Money {
        self.interest_payment + self.principal_payment + self.additional_balance_payment
    }
}

// ---------------------------------------------------------------------------
// Core math
// ---------------------------------------------------------------------------

/// Split a payment in strict priority order: interest owed, then principal
/// owed, then extra balance paydown capped at `balance - principal_owed`.
pub fn allocate_payment(
    payment_amount: Money,
    balance: Money,
    interest_owed: Money,
    principal_owed: Money,
) -> PaymentAllocation {
    let interest_payment = payment_amount.min(interest_owed);
    let mut remaining = payment_amount - interest_payment;

    let principal_payment = remaining.min(principal_owed);
    remaining -= principal_payment;

    let balance_headroom = (balance - principal_owed).max(Money::ZERO);
    let additional_balance_payment = remaining.min(balance_headroom);
    remaining -= additional_balance_payment;

    PaymentAllocation {
        interest_payment,
        principal_payment,
        additional_balance_payment,
        payment_remainder: remaining,
    }
}

// ---------------------------------------------------------------------------
// Calculator entry point
// ---------------------------------------------------------------------------

pub fn run_payment_allocation(
    input: &PaymentAllocationInput,
) -> TranchePoolResult<ComputationOutput<PaymentAllocation>> {
    let mut warnings: Vec<String> = Vec::new();

    for (field, value) in [
        ("payment_amount", input.payment_amount),
        ("balance", input.balance),
        ("interest_owed", input.interest_owed),
        ("principal_owed", input.principal_owed),
    ] {
        if value < Money::ZERO {
            return Err(TranchePoolError::InvalidInput {
                field: field.into(),
                reason: "cannot be negative".into(),
            });
        }
    }
    if input.principal_owed > input.balance {
        return Err(TranchePoolError::InvalidInput {
            field: "principal_owed".into(),
            reason: "cannot exceed the outstanding balance".into(),
        });
    }

    let allocation = allocate_payment(
        input.payment_amount,
        input.balance,
        input.interest_owed,
        input.principal_owed,
    );
    if !allocation.payment_remainder.is_zero() {
        warnings.push(format!(
            "Payment exceeds everything owed; {} to be refunded",
            allocation.payment_remainder
        ));
    }

    Ok(with_metadata(
        "Payment allocation: interest owed, then principal owed, then balance paydown",
        &serde_json::json!({
            "payment_amount": input.payment_amount.to_string(),
            "balance": input.balance.to_string(),
        }),
        warnings,
        allocation,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
