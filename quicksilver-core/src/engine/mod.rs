//! Dispatch engine: the runner loop, handler contract, aggregation, and
//! built-in handlers.

pub mod aggregator;
pub mod handler;
pub mod handlers;
pub mod runner;
pub mod strategy;

pub use aggregator::TimeframeAggregator;
pub use handler::{Handler, HandlerError, ProcessOutcome, Subscription};
pub use handlers::{DebugHandler, EventLogger, HeartBeatStatusHandler, TickStatusHandler};
pub use runner::{
    Context, EventSource, QueueOnly, RunStats, Runner, RunnerConfig, Sourced, MAX_TRIES,
};
pub use strategy::Strategy;
