//! Quicksilver CLI — backtest replay and queue loop commands.
//!
//! Commands:
//! - `backtest` — replay a tick history file and print the run report
//! - `run` — consume the Redis event queue with the production handlers
//! - `debug` — consume the queue, logging every event and debug action

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use quicksilver_core::domain::{Account, OrderSide, PriceOrPips};
use quicksilver_core::engine::Handler;
use quicksilver_runner::{
    logging, BacktestRunner, DebugRunner, FirstTickEntry, ProductionRunner, Settings,
};
use rust_decimal::Decimal;

#[derive(Parser)]
#[command(
    name = "quicksilver",
    about = "Quicksilver CLI — event-driven FX dispatch, aggregation, and order simulation"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a tick history file through the full loop and print a report.
    Backtest {
        /// CSV tick file (INSTRUMENT,YYYYMMDD HH:MM:SS.ffffff,BID,ASK).
        file: PathBuf,

        /// Open one market order on the first tick of this instrument.
        #[arg(long)]
        instrument: Option<String>,

        /// Order side for --instrument.
        #[arg(long, default_value = "buy")]
        side: OrderSide,

        /// Lot size for --instrument.
        #[arg(long, default_value = "0.1")]
        lots: Decimal,

        /// Take-profit: absolute price (with a dot) or pip distance.
        #[arg(long)]
        take_profit: Option<PriceOrPips>,

        /// Stop-loss: absolute price (with a dot) or pip distance.
        #[arg(long)]
        stop_loss: Option<PriceOrPips>,
    },
    /// Consume the Redis event queue with the production handlers.
    Run {
        /// Queue key override. Defaults to the QUEUE_NAME environment value.
        #[arg(long)]
        queue: Option<String>,
    },
    /// Consume the queue, logging every event and answering debug actions.
    Debug {
        /// Queue key override. Defaults to the QUEUE_NAME environment value.
        #[arg(long)]
        queue: Option<String>,
    },
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Backtest { file, instrument, side, lots, take_profit, stop_loss } => {
            run_backtest(file, instrument, side, lots, take_profit, stop_loss)
        }
        Commands::Run { queue } => run_production(queue),
        Commands::Debug { queue } => run_debug(queue),
    }
}

fn run_backtest(
    file: PathBuf,
    instrument: Option<String>,
    side: OrderSide,
    lots: Decimal,
    take_profit: Option<PriceOrPips>,
    stop_loss: Option<PriceOrPips>,
) -> Result<()> {
    if !file.exists() {
        bail!("tick file '{}' not found", file.display());
    }

    let settings = Settings::from_env();
    let mut handlers: Vec<Box<dyn Handler>> = Vec::new();
    if let Some(symbol) = instrument {
        handlers.push(Box::new(FirstTickEntry::new(&symbol, side, lots, take_profit, stop_loss)));
    }

    let mut runner =
        BacktestRunner::build(&file, vec![Account::new()], handlers, settings.timezone_offset)?;
    let report = runner.run();
    println!("{report}");
    Ok(())
}

fn run_production(queue: Option<String>) -> Result<()> {
    let mut settings = Settings::from_env();
    if let Some(name) = queue {
        settings.queue_name = name;
    }
    let mut runner = ProductionRunner::build(&settings)?;
    runner.run();
    Ok(())
}

fn run_debug(queue: Option<String>) -> Result<()> {
    let mut settings = Settings::from_env();
    if let Some(name) = queue {
        settings.queue_name = name;
    }
    let mut runner = DebugRunner::build(&settings)?;
    runner.run();
    Ok(())
}
