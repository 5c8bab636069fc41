//! Quicksilver Runner — loop wiring on top of `quicksilver-core`.
//!
//! This crate builds on `quicksilver-core` to provide:
//! - Environment-driven settings for the queue loops
//! - Logging initialization (`RUST_LOG` / `LOG_LEVEL`)
//! - Tick-file backtest replay with a printable report
//! - Production and debug loops fed from the Redis queue

pub mod config;
pub mod logging;
pub mod result;
pub mod runner;

pub use config::{RedisSettings, Settings};
pub use result::{BacktestReport, OrderSummary};
pub use runner::{BacktestRunner, DebugRunner, FirstTickEntry, ProductionRunner, RunError};
