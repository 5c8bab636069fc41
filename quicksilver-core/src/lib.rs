//! Quicksilver Core — event dispatch loop, candle aggregation, order simulation.
//!
//! This crate contains the heart of the trading runtime:
//! - Domain types (events, instruments, timeframes, candles, orders, accounts)
//! - JSON wire codec for events crossing the queue
//! - Queue transport behind one contract (in-process and Redis)
//! - Single-threaded dispatch loop with bounded retries and heartbeats
//! - Timeframe aggregation from ticks to candles and boundary events
//! - Strategy trait for timeframe-driven signal generators
//! - Tick file replay for backtests

pub mod bus;
pub mod data;
pub mod domain;
pub mod engine;
pub mod queue;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything that crosses a thread or process seam
    /// is Send + Sync. Events travel through the queue, and the wiring layer
    /// hands configs and reports across binaries.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Event>();
        require_sync::<domain::Event>();
        require_send::<domain::EventBody>();
        require_sync::<domain::EventBody>();
        require_send::<domain::Timeframe>();
        require_sync::<domain::Timeframe>();
        require_send::<domain::Instrument>();
        require_sync::<domain::Instrument>();
        require_send::<domain::Candle>();
        require_sync::<domain::Candle>();
        require_send::<domain::CandleTimeline>();
        require_sync::<domain::CandleTimeline>();
        require_send::<domain::Order>();
        require_sync::<domain::Order>();
        require_send::<domain::Account>();
        require_sync::<domain::Account>();

        // Transport
        require_send::<queue::MemoryQueue>();
        require_sync::<queue::MemoryQueue>();
        require_send::<queue::TransportError>();
        require_sync::<queue::TransportError>();

        // Engine surface
        require_send::<engine::RunnerConfig>();
        require_sync::<engine::RunnerConfig>();
        require_send::<engine::RunStats>();
        require_sync::<engine::RunStats>();
        require_send::<engine::HandlerError>();
        require_sync::<engine::HandlerError>();
    }

    /// Dispatch contract: handlers receive the event read-only. Mutation
    /// happens on the context or on the retry counter inside the loop, never
    /// inside a handler. The signature enforces it; this documents it.
    #[test]
    fn handlers_cannot_mutate_the_event() {
        fn _check_trait_object_builds(
            handler: &mut dyn engine::Handler,
            event: &domain::Event,
            ctx: &mut engine::Context,
        ) -> Result<engine::ProcessOutcome, engine::HandlerError> {
            handler.process(event, ctx)
        }
    }
}
