use clap::Args;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use tranche_pool_core::config::ProtocolConfig;
use tranche_pool_core::gate::AllowList;
use tranche_pool_core::ledger::{LendingLedger, PoolParams};
use tranche_pool_core::types::{Money, PoolId, TicketId, Timestamp, TrancheId};
use tranche_pool_core::TranchePoolResult;

use crate::input;

/// Arguments for scenario replay
#[derive(Args)]
pub struct SimulateArgs {
    /// Path to a JSON/YAML scenario file
    #[arg(long)]
    pub input: Option<String>,
}

// ---------------------------------------------------------------------------
// Scenario format
// ---------------------------------------------------------------------------

/// A scenario: optional configuration, an optional depositor allow-list,
/// and a timestamped sequence of ledger calls.
#[derive(Debug, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub config: Option<ProtocolConfig>,
    /// When present, only these addresses may move capital in or out.
    #[serde(default)]
    pub allow_list: Option<Vec<String>>,
    pub events: Vec<ScenarioEvent>,
}

#[derive(Debug, Deserialize)]
pub struct ScenarioEvent {
    /// Ledger time of the call, epoch seconds.
    pub at: Timestamp,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    CreatePool {
        params: PoolParams,
    },
    Deposit {
        pool: PoolId,
        tranche: TrancheId,
        amount: Money,
        caller: String,
    },
    Withdraw {
        ticket: TicketId,
        amount: Money,
        caller: String,
    },
    WithdrawMax {
        ticket: TicketId,
        caller: String,
    },
    LockJuniorCapital {
        pool: PoolId,
        caller: String,
    },
    LockPool {
        pool: PoolId,
        caller: String,
    },
    InitializeNextSlice {
        pool: PoolId,
        fundable_at: Timestamp,
        caller: String,
    },
    Drawdown {
        pool: PoolId,
        amount: Money,
        caller: String,
    },
    Pay {
        pool: PoolId,
        amount: Money,
    },
    Assess {
        pool: PoolId,
    },
    SetLeverageRatio {
        pool: PoolId,
        ratio: Decimal,
        junior_locked_until: Timestamp,
    },
    EstimateInvestment {
        pool: PoolId,
    },
    Invest {
        pool: PoolId,
        caller: String,
    },
    Redeem {
        ticket: TicketId,
        caller: String,
    },
    AssessWritedown {
        pool: PoolId,
    },
}

impl Action {
    fn label(&self) -> &'static str {
        match self {
            Action::CreatePool { .. } => "create_pool",
            Action::Deposit { .. } => "deposit",
            Action::Withdraw { .. } => "withdraw",
            Action::WithdrawMax { .. } => "withdraw_max",
            Action::LockJuniorCapital { .. } => "lock_junior_capital",
            Action::LockPool { .. } => "lock_pool",
            Action::InitializeNextSlice { .. } => "initialize_next_slice",
            Action::Drawdown { .. } => "drawdown",
            Action::Pay { .. } => "pay",
            Action::Assess { .. } => "assess",
            Action::SetLeverageRatio { .. } => "set_leverage_ratio",
            Action::EstimateInvestment { .. } => "estimate_investment",
            Action::Invest { .. } => "invest",
            Action::Redeem { .. } => "redeem",
            Action::AssessWritedown { .. } => "assess_writedown",
        }
    }
}

/// One replayed call and what it returned.
#[derive(Debug, Serialize)]
pub struct StepOutcome {
    pub at: Timestamp,
    pub timestamp: String,
    pub action: &'static str,
    pub ok: bool,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub detail: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

pub fn run_simulate(args: SimulateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let scenario: Scenario = if let Some(ref path) = args.input {
        input::file::read_document(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input scenario file is required (or pipe one on stdin)".into());
    };

    let config = scenario.config.unwrap_or_default();
    let mut ledger = match &scenario.allow_list {
        Some(addresses) => LendingLedger::with_gate(
            config,
            Box::new(AllowList::new(addresses.iter().cloned())),
        )?,
        None => LendingLedger::new(config)?,
    };

    let mut steps = Vec::with_capacity(scenario.events.len());
    for ScenarioEvent { at, action } in scenario.events {
        let label = action.label();
        match apply(&mut ledger, at, action) {
            Ok(detail) => steps.push(StepOutcome {
                at,
                timestamp: render_timestamp(at),
                action: label,
                ok: true,
                detail,
                error: None,
            }),
            // A failed call leaves the ledger untouched; the replay keeps
            // going so a scenario can exercise error paths.
            Err(e) => steps.push(StepOutcome {
                at,
                timestamp: render_timestamp(at),
                action: label,
                ok: false,
                detail: Value::Null,
                error: Some(e.to_string()),
            }),
        }
    }

    Ok(serde_json::json!({
        "result": {
            "steps": steps,
            "reserve_balance": ledger.reserve_balance(),
            "pools": ledger.pools(),
            "credit_lines": ledger.credit_lines(),
            "tickets": ledger.tickets(),
        },
        "methodology": "Scenario replay through the lending ledger",
    }))
}

fn apply(ledger: &mut LendingLedger, at: Timestamp, action: Action) -> TranchePoolResult<Value> {
    Ok(match action {
        Action::CreatePool { params } => {
            let pool = ledger.create_pool(params)?;
            serde_json::json!({ "pool": pool })
        }
        Action::Deposit {
            pool,
            tranche,
            amount,
            caller,
        } => {
            let ticket = ledger.deposit(pool, tranche, amount, &caller, at)?;
            serde_json::json!({ "ticket": ticket })
        }
        Action::Withdraw {
            ticket,
            amount,
            caller,
        } => {
            let (interest, principal) = ledger.withdraw(ticket, amount, &caller, at)?;
            serde_json::json!({ "interest": interest, "principal": principal })
        }
        Action::WithdrawMax { ticket, caller } => {
            let (interest, principal) = ledger.withdraw_max(ticket, &caller, at)?;
            serde_json::json!({ "interest": interest, "principal": principal })
        }
        Action::LockJuniorCapital { pool, caller } => {
            ledger.lock_junior_capital(pool, &caller, at)?;
            Value::Null
        }
        Action::LockPool { pool, caller } => {
            ledger.lock_pool(pool, &caller, at)?;
            Value::Null
        }
        Action::InitializeNextSlice {
            pool,
            fundable_at,
            caller,
        } => {
            let slice = ledger.initialize_next_slice(pool, fundable_at, &caller, at)?;
            serde_json::json!({ "slice": slice })
        }
        Action::Drawdown {
            pool,
            amount,
            caller,
        } => {
            ledger.drawdown(pool, amount, &caller, at)?;
            Value::Null
        }
        Action::Pay { pool, amount } => {
            let receipt = ledger.pay(pool, amount, at)?;
            serde_json::to_value(receipt)?
        }
        Action::Assess { pool } => {
            let (interest_owed, principal_owed) = ledger.assess(pool, at)?;
            serde_json::json!({
                "interest_owed": interest_owed,
                "principal_owed": principal_owed,
            })
        }
        Action::SetLeverageRatio {
            pool,
            ratio,
            junior_locked_until,
        } => {
            ledger.set_leverage_ratio(pool, ratio, junior_locked_until)?;
            Value::Null
        }
        Action::EstimateInvestment { pool } => {
            let amount = ledger.estimate_investment(pool)?;
            serde_json::json!({ "investment_amount": amount })
        }
        Action::Invest { pool, caller } => {
            let ticket = ledger.invest(pool, &caller)?;
            serde_json::json!({ "ticket": ticket })
        }
        Action::Redeem { ticket, caller } => {
            let (interest, principal) = ledger.redeem(ticket, &caller, at)?;
            serde_json::json!({ "interest": interest, "principal": principal })
        }
        Action::AssessWritedown { pool } => {
            let amount = ledger.assess_writedown(pool, at)?;
            serde_json::json!({ "writedown_amount": amount })
        }
    })
}

fn render_timestamp(at: Timestamp) -> String {
    chrono::DateTime::from_timestamp(at as i64, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| at.to_string())
}
