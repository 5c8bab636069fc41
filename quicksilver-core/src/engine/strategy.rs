//! Strategy — timeframe-driven signal generators as handlers.

use tracing::error;

use crate::domain::{Event, EventBody, EventKind, Timeframe};

use super::handler::{Handler, HandlerError, ProcessOutcome, Subscription};
use super::runner::Context;

/// A trading strategy reacting to window boundaries on its own timeframes.
///
/// Implementors get [`Handler`] for free: the blanket impl subscribes to
/// `TimeFrame` events, filters on `timeframes()`, and calls `signal_pair`
/// once per configured pair. A failing pair is logged and skipped so one
/// broken symbol cannot silence the rest.
pub trait Strategy {
    fn name(&self) -> &'static str;

    /// Timeframes whose boundary events trigger `signal_pair`.
    fn timeframes(&self) -> &[Timeframe];

    /// Instrument symbols this strategy trades, in canonical form.
    fn pairs(&self) -> &[String];

    fn signal_pair(&mut self, pair: &str, event: &Event, ctx: &mut Context)
        -> Result<(), HandlerError>;
}

impl<T: Strategy> Handler for T {
    fn name(&self) -> &'static str {
        Strategy::name(self)
    }

    fn subscription(&self) -> Subscription {
        Subscription::Only(&[EventKind::TimeFrame])
    }

    fn process(&mut self, event: &Event, ctx: &mut Context) -> Result<ProcessOutcome, HandlerError> {
        if let EventBody::TimeFrame { timeframe, .. } = &event.body {
            if self.timeframes().contains(timeframe) {
                let pairs: Vec<String> = self.pairs().to_vec();
                for pair in pairs {
                    if let Err(err) = self.signal_pair(&pair, event, ctx) {
                        error!(
                            strategy = Strategy::name(self),
                            pair = %pair,
                            error = %err,
                            "signal failed, skipping pair"
                        );
                    }
                }
            }
        }
        Ok(ProcessOutcome::Consumed)
    }
}
