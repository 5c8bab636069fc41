//! Built-in handlers — debug actions, event logging, status writes.

use tracing::{debug, info};

use crate::domain::{Event, EventBody, EventKind};
use crate::queue::StatusSink;

use super::handler::{Handler, HandlerError, ProcessOutcome, Subscription};
use super::runner::Context;

/// Routes `Debug` event actions to account summaries and test output.
///
/// Recognized actions (case-insensitive): `account`, `trade`, `order`,
/// `test_message`. Anything else is logged and ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebugHandler;

impl Handler for DebugHandler {
    fn name(&self) -> &'static str {
        "DebugHandler"
    }

    fn subscription(&self) -> Subscription {
        Subscription::Only(&[EventKind::Debug])
    }

    fn process(&mut self, event: &Event, ctx: &mut Context) -> Result<ProcessOutcome, HandlerError> {
        if let EventBody::Debug { action } = &event.body {
            match action.to_ascii_lowercase().as_str() {
                "account" => {
                    for account in &ctx.accounts {
                        account.log_summary();
                    }
                }
                "trade" => {
                    for account in &ctx.accounts {
                        account.log_trades();
                    }
                }
                "order" => {
                    for account in &ctx.accounts {
                        account.log_orders();
                    }
                }
                "test_message" => info!("test message received"),
                other => info!(action = other, "unrecognized debug action"),
            }
        }
        Ok(ProcessOutcome::Consumed)
    }
}

/// Logs every event it sees. The wildcard subscriber of the debug loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventLogger;

impl Handler for EventLogger {
    fn name(&self) -> &'static str {
        "EventLogger"
    }

    fn subscription(&self) -> Subscription {
        Subscription::All
    }

    fn process(&mut self, event: &Event, _ctx: &mut Context) -> Result<ProcessOutcome, HandlerError> {
        info!(kind = %event.kind(), tried = event.tried, time = %event.time, body = ?event.body, "event");
        Ok(ProcessOutcome::Consumed)
    }
}

/// Records the last tick time in the status store, or logs the tick in
/// debug mode.
pub struct TickStatusHandler {
    debug_mode: bool,
    status: Box<dyn StatusSink>,
}

impl TickStatusHandler {
    pub fn new(debug_mode: bool, status: Box<dyn StatusSink>) -> Self {
        Self { debug_mode, status }
    }
}

impl Handler for TickStatusHandler {
    fn name(&self) -> &'static str {
        "TickStatusHandler"
    }

    fn subscription(&self) -> Subscription {
        Subscription::Only(&[EventKind::TickPrice])
    }

    fn process(&mut self, event: &Event, _ctx: &mut Context) -> Result<ProcessOutcome, HandlerError> {
        if let Some(tick) = event.as_tick() {
            if self.debug_mode {
                debug!(instrument = tick.instrument, bid = %tick.bid, ask = %tick.ask, "tick");
            } else if let Err(err) = self.status.set_last_tick(tick.time) {
                return Err(HandlerError::with_source("last-tick status write failed", err));
            }
        }
        Ok(ProcessOutcome::Consumed)
    }
}

/// Refreshes the heartbeat stamp and periodically reports the stored
/// last-tick time, roughly every two minutes of heartbeats.
pub struct HeartBeatStatusHandler {
    debug_mode: bool,
    status: Box<dyn StatusSink>,
    report_every: u64,
}

/// Target seconds between liveness reports.
const REPORT_PERIOD_SECS: u64 = 120;

impl HeartBeatStatusHandler {
    pub fn new(debug_mode: bool, status: Box<dyn StatusSink>, interval_secs: u64) -> Self {
        let report_every = (REPORT_PERIOD_SECS / interval_secs.max(1)).max(1);
        Self { debug_mode, status, report_every }
    }
}

impl Handler for HeartBeatStatusHandler {
    fn name(&self) -> &'static str {
        "HeartBeatStatusHandler"
    }

    fn subscription(&self) -> Subscription {
        Subscription::Only(&[EventKind::HeartBeat])
    }

    fn process(&mut self, event: &Event, _ctx: &mut Context) -> Result<ProcessOutcome, HandlerError> {
        if let EventBody::HeartBeat { counter } = event.body {
            if self.debug_mode {
                debug!(counter, "heartbeat");
            } else if let Err(err) = self.status.set_heartbeat() {
                return Err(HandlerError::with_source("heartbeat status write failed", err));
            }

            if counter % self.report_every == 0 {
                let last_tick = self.status.last_tick().ok().flatten();
                info!(counter, last_tick = last_tick.as_deref().unwrap_or("none"), "liveness");
            }
        }
        Ok(ProcessOutcome::Consumed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Account, OrderSide, TickView};
    use crate::queue::{MemoryQueue, NullStatus, TransportError};
    use chrono::{NaiveDate, NaiveDateTime};
    use rust_decimal_macros::dec;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2018, 12, 3).unwrap().and_hms_opt(4, 41, 31).unwrap()
    }

    fn ctx() -> Context {
        Context::new(Box::new(MemoryQueue::new()), vec![Account::new()])
    }

    /// Records status calls instead of talking to a store.
    #[derive(Default)]
    struct SpySink {
        last_ticks: Rc<RefCell<Vec<NaiveDateTime>>>,
        heartbeats: Rc<RefCell<u32>>,
    }

    impl StatusSink for SpySink {
        fn set_last_tick(&mut self, time: NaiveDateTime) -> Result<(), TransportError> {
            self.last_ticks.borrow_mut().push(time);
            Ok(())
        }

        fn set_heartbeat(&mut self) -> Result<(), TransportError> {
            *self.heartbeats.borrow_mut() += 1;
            Ok(())
        }

        fn last_tick(&mut self) -> Result<Option<String>, TransportError> {
            Ok(self.last_ticks.borrow().last().map(|t| t.to_string()))
        }
    }

    #[test]
    fn tick_status_writes_outside_debug_mode() {
        let ticks = Rc::new(RefCell::new(Vec::new()));
        let sink = SpySink { last_ticks: Rc::clone(&ticks), ..Default::default() };
        let mut handler = TickStatusHandler::new(false, Box::new(sink));

        let event = Event::tick_price("GBPUSD", dec!(1.27211), dec!(1.27256), t0());
        handler.process(&event, &mut ctx()).unwrap();
        assert_eq!(*ticks.borrow(), vec![t0()]);
    }

    #[test]
    fn tick_status_stays_local_in_debug_mode() {
        let ticks = Rc::new(RefCell::new(Vec::new()));
        let sink = SpySink { last_ticks: Rc::clone(&ticks), ..Default::default() };
        let mut handler = TickStatusHandler::new(true, Box::new(sink));

        let event = Event::tick_price("GBPUSD", dec!(1.27211), dec!(1.27256), t0());
        handler.process(&event, &mut ctx()).unwrap();
        assert!(ticks.borrow().is_empty());
    }

    #[test]
    fn heartbeat_reports_on_the_report_cadence() {
        // 5s heartbeats report every 24 counters (two minutes).
        let handler = HeartBeatStatusHandler::new(false, Box::new(NullStatus), 5);
        assert_eq!(handler.report_every, 24);

        // Long intervals still report on every heartbeat.
        let handler = HeartBeatStatusHandler::new(false, Box::new(NullStatus), 300);
        assert_eq!(handler.report_every, 1);

        // A zero interval cannot divide by zero.
        let handler = HeartBeatStatusHandler::new(false, Box::new(NullStatus), 0);
        assert_eq!(handler.report_every, REPORT_PERIOD_SECS);
    }

    #[test]
    fn heartbeat_refreshes_the_stamp() {
        let beats = Rc::new(RefCell::new(0));
        let sink = SpySink { heartbeats: Rc::clone(&beats), ..Default::default() };
        let mut handler = HeartBeatStatusHandler::new(false, Box::new(sink), 5);

        for counter in 1..=3 {
            handler.process(&Event::heart_beat(counter, t0()), &mut ctx()).unwrap();
        }
        assert_eq!(*beats.borrow(), 3);
    }

    #[test]
    fn debug_actions_are_case_insensitive() {
        let mut ctx = ctx();
        let tick = TickView { instrument: "EURUSD", bid: dec!(1.1330), ask: dec!(1.1333), time: t0() };
        ctx.accounts[0].market_order("EURUSD", OrderSide::Buy, dec!(0.1), None, None, tick);

        let mut handler = DebugHandler;
        for action in ["Account", "TRADE", "order", "test_message", "bogus"] {
            handler.process(&Event::debug(action, t0()), &mut ctx).unwrap();
        }
    }

    #[test]
    fn event_logger_consumes_everything() {
        let mut handler = EventLogger;
        let outcome = handler.process(&Event::heart_beat(1, t0()), &mut ctx()).unwrap();
        assert_eq!(outcome, ProcessOutcome::Consumed);
        assert!(handler.subscription().accepts(EventKind::Debug));
    }
}
