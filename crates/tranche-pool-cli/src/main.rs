mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::accrual::{AccrueArgs, AllocateArgs, WritedownArgs};
use commands::leverage::EstimateInvestmentArgs;
use commands::simulate::SimulateArgs;

/// Tranched pooled-lending accounting engine
#[derive(Parser)]
#[command(
    name = "tpl",
    version,
    about = "Tranched pooled-lending accounting engine",
    long_about = "A CLI for the tranched pooled-lending accounting engine. \
                  Computes credit-line accrual, payment allocation, write-downs, \
                  and leverage sizing with decimal precision, and replays whole \
                  pool scenarios through the ledger."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Assess a credit line's owed interest and principal
    Accrue(AccrueArgs),
    /// Compute the lateness write-down of a credit line
    Writedown(WritedownArgs),
    /// Split a payment by strict priority (interest, principal, balance)
    Allocate(AllocateArgs),
    /// Size the senior co-investment for a junior deposit
    EstimateInvestment(EstimateInvestmentArgs),
    /// Replay a pool scenario file through the ledger
    Simulate(SimulateArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Accrue(args) => commands::accrual::run_accrue(args),
        Commands::Writedown(args) => commands::accrual::run_writedown(args),
        Commands::Allocate(args) => commands::accrual::run_allocate(args),
        Commands::EstimateInvestment(args) => commands::leverage::run_estimate_investment(args),
        Commands::Simulate(args) => commands::simulate::run_simulate(args),
        Commands::Version => {
            println!("tpl {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
