use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use tranche_pool_core::leverage::{run_investment_estimate, InvestmentEstimateInput};

use crate::input;

/// Arguments for sizing a senior co-investment
#[derive(Args)]
pub struct EstimateInvestmentArgs {
    /// Path to a JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Junior tranche principal deposited
    #[arg(long)]
    pub junior_deposited: Option<Decimal>,

    /// Senior tranche principal already deposited
    #[arg(long, default_value = "0")]
    pub senior_deposited: Decimal,

    /// Leverage ratio (e.g. 4 = four senior dollars per junior dollar)
    #[arg(long)]
    pub ratio: Option<Decimal>,
}

pub fn run_estimate_investment(
    args: EstimateInvestmentArgs,
) -> Result<Value, Box<dyn std::error::Error>> {
    let estimate_input: InvestmentEstimateInput = if let Some(ref path) = args.input {
        input::file::read_document(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        InvestmentEstimateInput {
            junior_principal_deposited: args
                .junior_deposited
                .ok_or("--junior-deposited is required (or provide --input)")?,
            senior_principal_deposited: args.senior_deposited,
            leverage_ratio: args.ratio.ok_or("--ratio is required (or provide --input)")?,
        }
    };

    let result = run_investment_estimate(&estimate_input)?;
    Ok(serde_json::to_value(result)?)
}
