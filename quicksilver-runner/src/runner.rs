//! Runner wiring: the backtest replay and the queue-fed loops.

use std::path::Path;
use std::time::Instant;

use quicksilver_core::data::TickFile;
use quicksilver_core::domain::{
    normalize_symbol, Account, Event, EventKind, OrderSide, PriceOrPips, Timeframe,
};
use quicksilver_core::engine::{
    Context, DebugHandler, EventLogger, Handler, HandlerError, HeartBeatStatusHandler,
    ProcessOutcome, QueueOnly, RunStats, Runner, RunnerConfig, Subscription, TickStatusHandler,
    TimeframeAggregator,
};
use quicksilver_core::queue::{
    MemoryQueue, NullStatus, RedisQueue, RedisStatus, StatusSink, TransportError,
};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;

use crate::config::Settings;
use crate::result::{BacktestReport, OrderSummary};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("tick file: {0}")]
    TickFile(#[from] std::io::Error),
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
}

/// Replays a tick file through the dispatch loop, flat out, and reports.
pub struct BacktestRunner {
    runner: Runner<TickFile>,
}

impl BacktestRunner {
    /// Wire a replay over an in-process queue: the aggregator first, then
    /// the caller's handlers, so boundary bookkeeping precedes strategy
    /// reactions to the same event.
    pub fn build(
        path: &Path,
        accounts: Vec<Account>,
        handlers: Vec<Box<dyn Handler>>,
        timezone_offset: i64,
    ) -> Result<Self, RunError> {
        let source = TickFile::open(path)?;
        let mut runner = Runner::new(
            "backtest",
            RunnerConfig::backtest(),
            Box::new(MemoryQueue::new()),
            source,
            accounts,
        );
        runner.register(Box::new(TimeframeAggregator::new(timezone_offset)));
        for handler in handlers {
            runner.register(handler);
        }
        Ok(Self { runner })
    }

    /// Drain the file to exhaustion and summarize the run.
    pub fn run(&mut self) -> BacktestReport {
        let started = Instant::now();
        let stats = self.runner.run();
        let elapsed = started.elapsed();

        let source = self.runner.source();
        let ctx = self.runner.context();
        let candle_counts = Timeframe::ALL
            .iter()
            .map(|&timeframe| (timeframe, ctx.timeline.candles_created(timeframe)))
            .collect();
        let orders = ctx
            .accounts
            .iter()
            .flat_map(|account| account.orders())
            .map(OrderSummary::from)
            .collect();

        BacktestReport {
            lines: source.line_count(),
            skipped: source.skipped(),
            events_dispatched: stats.events_dispatched,
            candle_counts,
            orders,
            elapsed,
        }
    }
}

/// Queue-fed loop for live operation: the aggregator plus the status
/// handlers, timing from [`Settings`].
pub struct ProductionRunner {
    runner: Runner<QueueOnly>,
}

impl ProductionRunner {
    pub fn build(settings: &Settings) -> Result<Self, RunError> {
        let queue = RedisQueue::connect(&settings.redis.url(), &settings.queue_name)?;
        info!(queue = queue.key(), debug = settings.debug, "production loop wiring");
        let mut runner = Runner::new(
            "production",
            settings.runner_config(),
            Box::new(queue),
            QueueOnly,
            Vec::new(),
        );
        runner.register(Box::new(TimeframeAggregator::new(settings.timezone_offset)));
        runner.register(Box::new(TickStatusHandler::new(settings.debug, status_sink(settings)?)));
        runner.register(Box::new(HeartBeatStatusHandler::new(
            settings.debug,
            status_sink(settings)?,
            settings.heartbeat_interval.as_secs(),
        )));
        Ok(Self { runner })
    }

    /// Run until the process is stopped.
    pub fn run(&mut self) -> RunStats {
        self.runner.run()
    }
}

/// Queue-fed loop that logs every event and answers debug actions. For
/// poking events into the queue by hand.
pub struct DebugRunner {
    runner: Runner<QueueOnly>,
}

impl DebugRunner {
    pub fn build(settings: &Settings) -> Result<Self, RunError> {
        let queue = RedisQueue::connect(&settings.redis.url(), &settings.queue_name)?;
        info!(queue = queue.key(), "debug loop wiring");
        let mut runner = Runner::new(
            "debug",
            settings.runner_config(),
            Box::new(queue),
            QueueOnly,
            vec![Account::new()],
        );
        runner.register(Box::new(EventLogger));
        runner.register(Box::new(TimeframeAggregator::new(settings.timezone_offset)));
        runner.register(Box::new(DebugHandler));
        Ok(Self { runner })
    }

    pub fn run(&mut self) -> RunStats {
        self.runner.run()
    }
}

fn status_sink(settings: &Settings) -> Result<Box<dyn StatusSink>, RunError> {
    if settings.debug {
        Ok(Box::new(NullStatus))
    } else {
        Ok(Box::new(RedisStatus::connect(&settings.redis.url())?))
    }
}

/// Demo strategy for the CLI: opens one market order per account on the
/// first tick of the chosen instrument, then goes quiet.
pub struct FirstTickEntry {
    instrument: String,
    side: OrderSide,
    lots: Decimal,
    take_profit: Option<PriceOrPips>,
    stop_loss: Option<PriceOrPips>,
    opened: bool,
}

impl FirstTickEntry {
    pub fn new(
        instrument: &str,
        side: OrderSide,
        lots: Decimal,
        take_profit: Option<PriceOrPips>,
        stop_loss: Option<PriceOrPips>,
    ) -> Self {
        Self {
            instrument: normalize_symbol(instrument),
            side,
            lots,
            take_profit,
            stop_loss,
            opened: false,
        }
    }
}

impl Handler for FirstTickEntry {
    fn name(&self) -> &'static str {
        "FirstTickEntry"
    }

    fn subscription(&self) -> Subscription {
        Subscription::Only(&[EventKind::TickPrice])
    }

    fn process(&mut self, event: &Event, ctx: &mut Context) -> Result<ProcessOutcome, HandlerError> {
        if let Some(tick) = event.as_tick() {
            if !self.opened && tick.instrument == self.instrument {
                self.opened = true;
                for account in &mut ctx.accounts {
                    account.market_order(
                        &self.instrument,
                        self.side,
                        self.lots,
                        self.take_profit,
                        self.stop_loss,
                        tick,
                    );
                }
            }
        }
        Ok(ProcessOutcome::Consumed)
    }
}
