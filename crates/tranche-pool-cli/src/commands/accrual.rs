use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use tranche_pool_core::accrual::{
    assess_owed, run_payment_allocation, AccrualInput, PaymentAllocationInput, WritedownInput,
};
use tranche_pool_core::credit::CreditLine;

use crate::input;

/// Arguments for a credit-line accrual assessment
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct AccrueArgs {
    /// Path to a JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Outstanding principal balance
    #[arg(long)]
    pub balance: Option<Decimal>,

    /// Annual interest rate as a decimal (0.05 = 5%)
    #[arg(long)]
    pub interest_apr: Option<Decimal>,

    /// Annual late-fee rate as a decimal
    #[arg(long, default_value = "0")]
    pub late_fee_apr: Decimal,

    /// Payment period in days
    #[arg(long, default_value = "30")]
    pub payment_period_days: u64,

    /// Timestamp accrual was last computed through (epoch seconds)
    #[arg(long)]
    pub accrued_as_of: Option<u64>,

    /// Timestamp of the last full payment (epoch seconds)
    #[arg(long)]
    pub last_full_payment: Option<u64>,

    /// Term end timestamp; zero for a loan not yet drawn
    #[arg(long, default_value = "0")]
    pub term_end: u64,

    /// Interest already owed before this window
    #[arg(long, default_value = "0")]
    pub interest_owed: Decimal,

    /// Ledger time to accrue through (epoch seconds)
    #[arg(long)]
    pub as_of: Option<u64>,

    /// Late-fee grace period in days
    #[arg(long, default_value = "30")]
    pub grace_days: u64,
}

/// Arguments for a write-down computation
#[derive(Args)]
pub struct WritedownArgs {
    /// Path to a JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Outstanding principal balance
    #[arg(long)]
    pub balance: Option<Decimal>,

    /// Payment period in days
    #[arg(long, default_value = "30")]
    pub payment_period_days: u64,

    /// Timestamp of the last full payment (epoch seconds)
    #[arg(long)]
    pub last_full_payment: Option<u64>,

    /// Ledger time to assess at (epoch seconds)
    #[arg(long)]
    pub as_of: Option<u64>,

    /// Grace period in days before any markdown
    #[arg(long, default_value = "30")]
    pub grace_days: u64,

    /// Payment periods of lateness at which the markdown reaches 100%
    #[arg(long, default_value = "4")]
    pub max_late_periods: u64,
}

/// Arguments for a payment allocation
#[derive(Args)]
pub struct AllocateArgs {
    /// Path to a JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Payment amount
    #[arg(long)]
    pub payment: Option<Decimal>,

    /// Outstanding principal balance
    #[arg(long)]
    pub balance: Option<Decimal>,

    /// Interest currently owed
    #[arg(long)]
    pub interest_owed: Option<Decimal>,

    /// Principal currently owed
    #[arg(long)]
    pub principal_owed: Option<Decimal>,
}

pub fn run_accrue(args: AccrueArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let accrual_input: AccrualInput = if let Some(ref path) = args.input {
        input::file::read_document(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let mut credit_line = CreditLine::default();
        credit_line.balance = args.balance.ok_or("--balance is required (or provide --input)")?;
        credit_line.interest_apr = args
            .interest_apr
            .ok_or("--interest-apr is required (or provide --input)")?;
        credit_line.late_fee_apr = args.late_fee_apr;
        credit_line.payment_period_in_days = args.payment_period_days;
        credit_line.interest_accrued_as_of = args
            .accrued_as_of
            .ok_or("--accrued-as-of is required (or provide --input)")?;
        credit_line.last_full_payment_time = args
            .last_full_payment
            .unwrap_or(credit_line.interest_accrued_as_of);
        credit_line.term_end_time = args.term_end;
        credit_line.interest_owed = args.interest_owed;
        AccrualInput {
            credit_line,
            as_of: args.as_of.ok_or("--as-of is required (or provide --input)")?,
            late_fee_grace_period_in_days: args.grace_days,
        }
    };

    let result = assess_owed(&accrual_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_writedown(args: WritedownArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let writedown_input: WritedownInput = if let Some(ref path) = args.input {
        input::file::read_document(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let mut credit_line = CreditLine::default();
        credit_line.balance = args.balance.ok_or("--balance is required (or provide --input)")?;
        credit_line.payment_period_in_days = args.payment_period_days;
        credit_line.last_full_payment_time = args
            .last_full_payment
            .ok_or("--last-full-payment is required (or provide --input)")?;
        WritedownInput {
            credit_line,
            as_of: args.as_of.ok_or("--as-of is required (or provide --input)")?,
            grace_period_in_days: args.grace_days,
            max_late_periods: args.max_late_periods,
        }
    };

    let result = tranche_pool_core::accrual::run_writedown(&writedown_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_allocate(args: AllocateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let allocation_input: PaymentAllocationInput = if let Some(ref path) = args.input {
        input::file::read_document(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        PaymentAllocationInput {
            payment_amount: args.payment.ok_or("--payment is required (or provide --input)")?,
            balance: args.balance.ok_or("--balance is required (or provide --input)")?,
            interest_owed: args
                .interest_owed
                .ok_or("--interest-owed is required (or provide --input)")?,
            principal_owed: args
                .principal_owed
                .ok_or("--principal-owed is required (or provide --input)")?,
        }
    };

    let result = run_payment_allocation(&allocation_input)?;
    Ok(serde_json::to_value(result)?)
}
