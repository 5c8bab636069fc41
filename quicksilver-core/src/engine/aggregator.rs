//! Aggregator — ticks and heartbeats folded into candles and boundary events.

use chrono::{Duration, NaiveDateTime, Utc};
use tracing::debug;

use crate::domain::{Event, EventKind, Timeframe};

use super::handler::{Handler, HandlerError, ProcessOutcome, Subscription};
use super::runner::Context;

/// Maintains the candle timeline and emits a `TimeFrame` event whenever a
/// window boundary is crossed.
///
/// Ticks drive both candles and boundaries; heartbeats advance boundaries on
/// the wall clock without touching any candle, so quiet markets still close
/// their windows. The first observation of each timeframe only records the
/// boundary (warm-up): a partial window never becomes a candle or an event.
#[derive(Debug, Clone)]
pub struct TimeframeAggregator {
    /// Offset in whole hours added to UTC for heartbeat-driven boundaries.
    timezone_offset: i64,
}

impl TimeframeAggregator {
    pub fn new(timezone_offset: i64) -> Self {
        Self { timezone_offset }
    }

    fn wall_clock(&self) -> NaiveDateTime {
        Utc::now().naive_utc() + Duration::hours(self.timezone_offset)
    }
}

impl Handler for TimeframeAggregator {
    fn name(&self) -> &'static str {
        "TimeframeAggregator"
    }

    fn subscription(&self) -> Subscription {
        Subscription::Only(&[EventKind::TickPrice, EventKind::HeartBeat])
    }

    fn process(&mut self, event: &Event, ctx: &mut Context) -> Result<ProcessOutcome, HandlerError> {
        let tick = event.as_tick();
        let now = match tick {
            Some(tick) => tick.time,
            None => self.wall_clock(),
        };

        if tick.is_some() {
            // Pre-seed the tick pseudo-timeframe: its boundary is the tick
            // itself, so it skips warm-up and never emits boundary events.
            ctx.timeline.set_boundary(Timeframe::Tick, now);
        }

        for timeframe in Timeframe::ALL {
            // Only ticks touch the tick pseudo-timeframe; a heartbeat's wall
            // clock must not become its boundary.
            if timeframe == Timeframe::Tick && tick.is_none() {
                continue;
            }

            let boundary = timeframe.floor(now);
            let previous = match ctx.timeline.boundary(timeframe) {
                Some(previous) => previous,
                None => {
                    ctx.timeline.set_boundary(timeframe, boundary);
                    continue;
                }
            };

            if let Some(tick) = tick {
                ctx.timeline.apply_tick(timeframe, boundary, tick.instrument, tick.bid, tick.ask);
            }

            if timeframe != Timeframe::Tick && boundary != previous {
                // The candle fold above must come first: when the boundary
                // event goes out, the fresh window's candle already exists.
                debug!(%timeframe, current = %boundary, %previous, "boundary crossed");
                let crossing =
                    Event::time_frame(timeframe, boundary, previous, self.timezone_offset, now);
                ctx.put_event(&crossing);
                ctx.timeline.set_boundary(timeframe, boundary);
            }
        }

        Ok(ProcessOutcome::Consumed)
    }
}
