use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::ProtocolConfig;
use crate::pool::tranche::TrancheSide;
use crate::pool::TranchedPool;
use crate::types::{fee_round, money_floor, Money, TrancheId};

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// What one tranche received from a payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrancheCredit {
    pub tranche: TrancheId,
    pub slice: usize,
    pub side: TrancheSide,
    pub interest_credited: Money,
    pub principal_credited: Money,
}

/// Full accounting of one waterfall run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterfallReport {
    pub gross_interest: Money,
    pub gross_principal: Money,
    /// Skimmed into the protocol reserve before any tranche is paid.
    pub reserve_fee: Money,
    /// Junior interest diverted to senior tranches.
    pub junior_fee_diverted: Money,
    pub credits: Vec<TrancheCredit>,
    /// Floor-rounding residue not representable in any share price.
    pub interest_dust: Money,
    pub principal_dust: Money,
}

impl WaterfallReport {
    pub fn total_interest_credited(&self) -> Money {
        self.credits.iter().map(|c| c.interest_credited).sum()
    }

    pub fn total_principal_credited(&self) -> Money {
        self.credits.iter().map(|c| c.principal_credited).sum()
    }
}

// ---------------------------------------------------------------------------
// Distribution
// ---------------------------------------------------------------------------

/// Snapshot of one tranche taken before any mutation.
struct Entry {
    slice: usize,
    id: TrancheId,
    side: TrancheSide,
    deployed: Money,
    deposited: Money,
}

/// Distribute an allocated payment across every slice's tranches.
///
/// Interest order: reserve fee off the top, then senior tranches across all
/// slices up to their period demand, then junior tranches net of the junior
/// fee (which tops up senior yield), then any excess entirely to junior.
/// Principal order: senior tranches across all slices until whole, then
/// junior. Within a priority class everything is pro-rata by principal
/// deployed.
///
/// `interest_owed_at_assessment` is the credit line's total interest owed
/// when the payment was assessed; it defines each tranche's period demand.
pub fn distribute_payment(
    pool: &mut TranchedPool,
    interest_amount: Money,
    principal_amount: Money,
    interest_owed_at_assessment: Money,
    config: &ProtocolConfig,
) -> WaterfallReport {
    let entries: Vec<Entry> = pool
        .slices
        .iter()
        .flat_map(|slice| {
            [&slice.senior, &slice.junior].map(|tranche| Entry {
                slice: slice.index,
                id: tranche.id,
                side: tranche.side(),
                deployed: tranche.principal_outstanding(),
                deposited: tranche.principal_deposited,
            })
        })
        .collect();
    let total_deployed: Money = entries.iter().map(|e| e.deployed).sum();

    let reserve_fee = fee_round(interest_amount * config.reserve_fee_percent).min(interest_amount);
    let net_interest = interest_amount - reserve_fee;

    let mut interest_credits = vec![Money::ZERO; entries.len()];
    let mut junior_fee_diverted = Money::ZERO;

    if !total_deployed.is_zero() && !net_interest.is_zero() {
        // Period demand per tranche: its deployed share of the interest the
        // loan owed at assessment, net of the reserve skim.
        let demand_base =
            interest_owed_at_assessment * (Decimal::ONE - config.reserve_fee_percent);
        let demands: Vec<Money> = entries
            .iter()
            .map(|e| money_floor(demand_base * e.deployed / total_deployed))
            .collect();

        let senior_demand: Money = entries
            .iter()
            .zip(&demands)
            .filter(|(e, _)| e.side == TrancheSide::Senior)
            .map(|(_, d)| *d)
            .sum();
        let junior_demand: Money = entries
            .iter()
            .zip(&demands)
            .filter(|(e, _)| e.side == TrancheSide::Junior)
            .map(|(_, d)| *d)
            .sum();
        let total_senior_deployed: Money = entries
            .iter()
            .filter(|e| e.side == TrancheSide::Senior)
            .map(|e| e.deployed)
            .sum();

        let mut remaining = net_interest;

        // (b) senior demand, globally first, pro-rata by demand.
        let senior_target = remaining.min(senior_demand);
        if !senior_target.is_zero() {
            for (i, entry) in entries.iter().enumerate() {
                if entry.side != TrancheSide::Senior || demands[i].is_zero() {
                    continue;
                }
                let pay = money_floor(senior_target * demands[i] / senior_demand);
                interest_credits[i] += pay;
                remaining -= pay;
            }
        }

        // (c) junior demand, net of the junior fee, only once every senior
        // tranche's demand is satisfied.
        if net_interest >= senior_demand {
            let junior_target = remaining.min(junior_demand);
            if !junior_target.is_zero() {
                let fee = if total_senior_deployed.is_zero() {
                    Money::ZERO
                } else {
                    fee_round(junior_target * config.junior_fee_percent).min(junior_target)
                };
                junior_fee_diverted = fee;
                let junior_net = junior_target - fee;

                for (i, entry) in entries.iter().enumerate() {
                    if entry.side != TrancheSide::Junior || demands[i].is_zero() {
                        continue;
                    }
                    let pay = money_floor(junior_net * demands[i] / junior_demand);
                    interest_credits[i] += pay;
                    remaining -= pay;
                }
                if !fee.is_zero() {
                    for (i, entry) in entries.iter().enumerate() {
                        if entry.side != TrancheSide::Senior || entry.deployed.is_zero() {
                            continue;
                        }
                        let pay = money_floor(fee * entry.deployed / total_senior_deployed);
                        interest_credits[i] += pay;
                        remaining -= pay;
                    }
                }
            }

            // (d) excess beyond every period demand flows entirely to junior.
            if junior_target >= junior_demand && !remaining.is_zero() {
                let junior_deposited_total: Money = entries
                    .iter()
                    .filter(|e| e.side == TrancheSide::Junior)
                    .map(|e| e.deposited)
                    .sum();
                if !junior_deposited_total.is_zero() {
                    for (i, entry) in entries.iter().enumerate() {
                        if entry.side != TrancheSide::Junior || entry.deposited.is_zero() {
                            continue;
                        }
                        let pay =
                            money_floor(remaining * entry.deposited / junior_deposited_total);
                        interest_credits[i] += pay;
                    }
                }
            }
        }
    }

    // (e) principal: senior across all slices until whole, then junior,
    // pro-rata by deployed principal.
    let mut principal_credits = vec![Money::ZERO; entries.len()];
    if !principal_amount.is_zero() {
        let senior_need: Money = entries
            .iter()
            .filter(|e| e.side == TrancheSide::Senior)
            .map(|e| e.deployed)
            .sum();
        let mut p_remaining = principal_amount;

        let senior_target = p_remaining.min(senior_need);
        if !senior_target.is_zero() {
            for (i, entry) in entries.iter().enumerate() {
                if entry.side != TrancheSide::Senior || entry.deployed.is_zero() {
                    continue;
                }
                let pay = money_floor(senior_target * entry.deployed / senior_need);
                principal_credits[i] += pay;
                p_remaining -= pay;
            }
        }

        if principal_amount >= senior_need {
            let junior_need: Money = entries
                .iter()
                .filter(|e| e.side == TrancheSide::Junior)
                .map(|e| e.deployed)
                .sum();
            let junior_target = p_remaining.min(junior_need);
            if !junior_target.is_zero() {
                for (i, entry) in entries.iter().enumerate() {
                    if entry.side != TrancheSide::Junior || entry.deployed.is_zero() {
                        continue;
                    }
                    principal_credits[i] += money_floor(junior_target * entry.deployed / junior_need);
                }
            }
        }
    }

    // Apply the computed credits to the share prices.
    let mut credits = Vec::with_capacity(entries.len());
    let mut interest_applied = Money::ZERO;
    let mut principal_applied = Money::ZERO;
    for (i, entry) in entries.iter().enumerate() {
        let slice = &mut pool.slices[entry.slice];
        let tranche = slice
            .tranche_mut(entry.id)
            .expect("entries reference existing tranches");
        let interest_credited = tranche.credit_interest(interest_credits[i]);
        let principal_credited = tranche.credit_principal(principal_credits[i]);
        slice.total_interest_accrued += interest_credited;
        slice.principal_deployed = (slice.principal_deployed - principal_credited).max(Money::ZERO);
        interest_applied += interest_credited;
        principal_applied += principal_credited;
        credits.push(TrancheCredit {
            tranche: entry.id,
            slice: entry.slice,
            side: entry.side,
            interest_credited,
            principal_credited,
        });
    }

    WaterfallReport {
        gross_interest: interest_amount,
        gross_principal: principal_amount,
        reserve_fee,
        junior_fee_diverted,
        credits,
        interest_dust: net_interest - interest_applied,
        principal_dust: principal_amount - principal_applied,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
