//! Runner — the single-threaded dispatch loop.
//!
//! One loop drains the queue, hands each event to every subscribed handler
//! in registration order, fans ticks out to the accounts, enforces the retry
//! budget, and synthesizes heartbeats between drain passes.

use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{error, info};

use crate::bus;
use crate::domain::{Account, CandleTimeline, Event};
use crate::queue::EventQueue;

use super::handler::{source_chain, Handler, ProcessOutcome};

/// Redelivery budget: an event is delivered at most `MAX_TRIES + 1` times.
pub const MAX_TRIES: u32 = 10;

/// Entries of an error source chain worth logging per handler failure.
const SOURCE_CHAIN_LIMIT: usize = 8;

/// Timing knobs for the loop. Backtests zero all three so replay runs flat
/// out with no synthesized heartbeats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Pause after each full drain pass.
    pub loop_sleep: Duration,
    /// Pause when a poll finds nothing.
    pub empty_sleep: Duration,
    /// Heartbeat synthesis interval; zero disables heartbeats.
    pub heartbeat_interval: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            loop_sleep: Duration::from_millis(100),
            empty_sleep: Duration::from_millis(500),
            heartbeat_interval: Duration::from_secs(5),
        }
    }
}

impl RunnerConfig {
    pub fn backtest() -> Self {
        Self {
            loop_sleep: Duration::ZERO,
            empty_sleep: Duration::ZERO,
            heartbeat_interval: Duration::ZERO,
        }
    }
}

/// Shared state handlers may touch: the queue (through `put_event`), the
/// registered accounts, and the candle timeline.
pub struct Context {
    queue: Box<dyn EventQueue>,
    pub accounts: Vec<Account>,
    pub timeline: CandleTimeline,
}

impl Context {
    pub fn new(queue: Box<dyn EventQueue>, accounts: Vec<Account>) -> Self {
        Self { queue, accounts, timeline: CandleTimeline::new() }
    }

    /// Encode and enqueue. Failures are logged and swallowed: emitting a
    /// follow-up event must never take down the handler that emitted it.
    pub fn put_event(&mut self, event: &Event) {
        let encoded = match bus::encode(event) {
            Ok(encoded) => encoded,
            Err(err) => {
                error!(error = %err, "event encode failed, dropping");
                return;
            }
        };
        if let Err(err) = self.queue.put(&encoded) {
            error!(error = %err, "queue put failed, dropping event");
        }
    }

    /// Poll the queue and decode. Transport failures and undecodable
    /// payloads are logged and reported as "nothing this cycle" so the loop
    /// keeps breathing.
    pub(crate) fn yield_event(&mut self, block: bool, timeout: Option<Duration>) -> Option<Event> {
        let raw = match self.queue.get(block, timeout) {
            Ok(raw) => raw?,
            Err(err) => {
                error!(error = %err, "queue get failed");
                return None;
            }
        };
        match bus::decode(&raw) {
            Ok(event) => Some(event),
            Err(err) => {
                error!(error = %err, payload = %raw, "dropping undecodable payload");
                None
            }
        }
    }
}

/// Where events come from once the queue is drained.
pub enum Sourced {
    Event(Event),
    /// Nothing right now; the loop backs off with `empty_sleep`.
    Empty,
    /// The source is finished; the loop shuts down.
    Exhausted,
}

pub trait EventSource {
    fn next_event(&mut self) -> Sourced;
}

/// Production source: the queue is the only feed, so a drained queue just
/// means waiting for more.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueOnly;

impl EventSource for QueueOnly {
    fn next_event(&mut self) -> Sourced {
        Sourced::Empty
    }
}

/// Counters accumulated across one `run`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Events handed to the handler pass, redeliveries included.
    pub events_dispatched: u64,
    /// Re-enqueues performed on handler request.
    pub retries: u64,
    /// Events dropped after exhausting the retry budget.
    pub dropped_exhausted: u64,
    /// Heartbeats synthesized.
    pub heartbeats: u64,
}

/// The dispatch loop. Owns the context, the handler registry, and the
/// retry and heartbeat machinery.
pub struct Runner<S: EventSource> {
    name: &'static str,
    config: RunnerConfig,
    handlers: Vec<Box<dyn Handler>>,
    source: S,
    ctx: Context,
    running: bool,
    halt: bool,
    heartbeat_count: u64,
    last_heartbeat: Instant,
    stats: RunStats,
}

impl<S: EventSource> Runner<S> {
    pub fn new(
        name: &'static str,
        config: RunnerConfig,
        queue: Box<dyn EventQueue>,
        source: S,
        accounts: Vec<Account>,
    ) -> Self {
        Self {
            name,
            config,
            handlers: Vec::new(),
            source,
            ctx: Context::new(queue, accounts),
            running: false,
            halt: false,
            heartbeat_count: 0,
            last_heartbeat: Instant::now(),
            stats: RunStats::default(),
        }
    }

    /// Append a handler. Dispatch order is registration order.
    pub fn register(&mut self, handler: Box<dyn Handler>) {
        self.handlers.push(handler);
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.ctx
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Stop after the current event: release the loop flags so both loop
    /// levels fall through.
    pub fn stop(&mut self) {
        self.halt = true;
        self.running = false;
    }

    /// Run until the source is exhausted or `stop` is called.
    pub fn run(&mut self) -> RunStats {
        self.launch();
        while self.running {
            while !self.halt {
                match self.next_event() {
                    Some(event) => self.dispatch(event),
                    None => {
                        pause(self.config.empty_sleep);
                        break;
                    }
                }
            }
            self.synthesize_heartbeat();
            pause(self.config.loop_sleep);
        }
        info!(
            runner = self.name,
            events = self.stats.events_dispatched,
            retries = self.stats.retries,
            dropped = self.stats.dropped_exhausted,
            "loop stopped"
        );
        self.stats.clone()
    }

    fn launch(&mut self) {
        let names: Vec<&str> = self.handlers.iter().map(|h| h.name()).collect();
        info!(runner = self.name, handlers = names.join(", "), "loop starting");
        self.running = true;
        self.halt = false;
        self.last_heartbeat = Instant::now();
    }

    /// Queue first, then the source: redeliveries and handler-emitted events
    /// always run before new source input.
    fn next_event(&mut self) -> Option<Event> {
        if let Some(event) = self.ctx.yield_event(false, None) {
            return Some(event);
        }
        match self.source.next_event() {
            Sourced::Event(event) => Some(event),
            Sourced::Empty => None,
            Sourced::Exhausted => {
                self.stop();
                None
            }
        }
    }

    fn dispatch(&mut self, mut event: Event) {
        self.stats.events_dispatched += 1;
        let kind = event.kind();
        let mut retry_requested = false;

        for handler in self.handlers.iter_mut() {
            if !handler.subscription().accepts(kind) {
                continue;
            }
            match handler.process(&event, &mut self.ctx) {
                Ok(ProcessOutcome::Consumed) => {}
                Ok(ProcessOutcome::Retry) => retry_requested = true,
                Err(err) => {
                    error!(
                        handler = handler.name(),
                        event = ?event.body,
                        error = %err,
                        "handler failed, continuing"
                    );
                    for cause in source_chain(&err, SOURCE_CHAIN_LIMIT).into_iter().skip(1) {
                        error!(handler = handler.name(), cause = %cause, "caused by");
                    }
                }
            }
        }

        if let Some(tick) = event.as_tick() {
            for account in &mut self.ctx.accounts {
                account.update_tick(tick);
            }
        }

        if retry_requested {
            if event.tried >= MAX_TRIES {
                self.stats.dropped_exhausted += 1;
                error!(tried = event.tried, event = ?event.body, "retry budget exhausted, dropping");
            } else {
                event.tried += 1;
                self.stats.retries += 1;
                self.ctx.put_event(&event);
            }
        }
    }

    /// Emit a heartbeat when the interval elapsed since the last one. Called
    /// once per outer pass, so heartbeats interleave with event bursts.
    fn synthesize_heartbeat(&mut self) {
        let interval = self.config.heartbeat_interval;
        if interval.is_zero() || self.last_heartbeat.elapsed() < interval {
            return;
        }
        self.heartbeat_count += 1;
        self.stats.heartbeats += 1;
        let event = Event::heart_beat(self.heartbeat_count, Utc::now().naive_utc());
        self.ctx.put_event(&event);
        self.last_heartbeat = Instant::now();
    }
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventKind, OrderSide};
    use crate::engine::handler::{HandlerError, Subscription};
    use crate::queue::MemoryQueue;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    fn t0() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2018, 12, 3).unwrap().and_hms_opt(4, 41, 31).unwrap()
    }

    struct Scripted {
        events: VecDeque<Event>,
    }

    impl Scripted {
        fn new(events: Vec<Event>) -> Self {
            Self { events: events.into() }
        }
    }

    impl EventSource for Scripted {
        fn next_event(&mut self) -> Sourced {
            match self.events.pop_front() {
                Some(event) => Sourced::Event(event),
                None => Sourced::Exhausted,
            }
        }
    }

    struct Recording {
        label: &'static str,
        subscription: Subscription,
        log: Rc<RefCell<Vec<(&'static str, EventKind)>>>,
    }

    impl Handler for Recording {
        fn name(&self) -> &'static str {
            self.label
        }

        fn subscription(&self) -> Subscription {
            self.subscription
        }

        fn process(&mut self, event: &Event, _ctx: &mut Context) -> Result<ProcessOutcome, HandlerError> {
            self.log.borrow_mut().push((self.label, event.kind()));
            Ok(ProcessOutcome::Consumed)
        }
    }

    struct AlwaysRetry {
        deliveries: Rc<RefCell<u32>>,
    }

    impl Handler for AlwaysRetry {
        fn name(&self) -> &'static str {
            "AlwaysRetry"
        }

        fn subscription(&self) -> Subscription {
            Subscription::All
        }

        fn process(&mut self, _event: &Event, _ctx: &mut Context) -> Result<ProcessOutcome, HandlerError> {
            *self.deliveries.borrow_mut() += 1;
            Ok(ProcessOutcome::Retry)
        }
    }

    struct Failing;

    impl Handler for Failing {
        fn name(&self) -> &'static str {
            "Failing"
        }

        fn subscription(&self) -> Subscription {
            Subscription::All
        }

        fn process(&mut self, _event: &Event, _ctx: &mut Context) -> Result<ProcessOutcome, HandlerError> {
            Err(HandlerError::new("boom"))
        }
    }

    fn backtest_runner(events: Vec<Event>) -> Runner<Scripted> {
        Runner::new(
            "test",
            RunnerConfig::backtest(),
            Box::new(MemoryQueue::new()),
            Scripted::new(events),
            Vec::new(),
        )
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut runner = backtest_runner(vec![Event::heart_beat(1, t0())]);
        for label in ["first", "second", "third"] {
            runner.register(Box::new(Recording {
                label,
                subscription: Subscription::All,
                log: Rc::clone(&log),
            }));
        }

        runner.run();
        let seen: Vec<&str> = log.borrow().iter().map(|(label, _)| *label).collect();
        assert_eq!(seen, vec!["first", "second", "third"]);
    }

    #[test]
    fn subscription_filters_delivery() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut runner = backtest_runner(vec![
            Event::heart_beat(1, t0()),
            Event::tick_price("GBPUSD", dec!(1.27211), dec!(1.27256), t0()),
        ]);
        runner.register(Box::new(Recording {
            label: "ticks",
            subscription: Subscription::Only(&[EventKind::TickPrice]),
            log: Rc::clone(&log),
        }));
        runner.register(Box::new(Recording {
            label: "all",
            subscription: Subscription::All,
            log: Rc::clone(&log),
        }));

        let stats = runner.run();
        assert_eq!(stats.events_dispatched, 2);
        let seen = log.borrow().clone();
        assert_eq!(
            seen,
            vec![
                ("all", EventKind::HeartBeat),
                ("ticks", EventKind::TickPrice),
                ("all", EventKind::TickPrice),
            ]
        );
    }

    #[test]
    fn retry_budget_allows_eleven_deliveries() {
        let deliveries = Rc::new(RefCell::new(0));
        let mut runner = backtest_runner(vec![Event::heart_beat(1, t0())]);
        runner.register(Box::new(AlwaysRetry { deliveries: Rc::clone(&deliveries) }));

        let stats = runner.run();
        assert_eq!(*deliveries.borrow(), MAX_TRIES + 1);
        assert_eq!(stats.retries, u64::from(MAX_TRIES));
        assert_eq!(stats.dropped_exhausted, 1);
    }

    #[test]
    fn handler_failure_does_not_stop_the_pass() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut runner = backtest_runner(vec![Event::heart_beat(1, t0())]);
        runner.register(Box::new(Failing));
        runner.register(Box::new(Recording {
            label: "after",
            subscription: Subscription::All,
            log: Rc::clone(&log),
        }));

        let stats = runner.run();
        assert_eq!(log.borrow().len(), 1);
        // A failure is not a retry.
        assert_eq!(stats.retries, 0);
    }

    #[test]
    fn ticks_fan_out_to_accounts_after_the_pass() {
        let open = Event::tick_price("EURUSD", dec!(1.1330), dec!(1.1333), t0());
        let next =
            Event::tick_price("EURUSD", dec!(1.1340), dec!(1.1343), t0() + chrono::Duration::seconds(5));
        let mut runner = backtest_runner(vec![open.clone(), next]);
        runner.context_mut().accounts.push(Account::new());

        let opening = open.as_tick().unwrap();
        runner.context_mut().accounts[0].market_order(
            "EURUSD",
            OrderSide::Buy,
            dec!(0.1),
            None,
            None,
            opening,
        );

        runner.run();
        let order_pips: Vec<_> =
            runner.context().accounts[0].orders().map(|order| order.pips()).collect();
        assert_eq!(order_pips, vec![dec!(7)]);
    }

    #[test]
    fn queued_events_run_before_source_events() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut runner = backtest_runner(vec![Event::tick_price(
            "GBPUSD",
            dec!(1.27211),
            dec!(1.27256),
            t0(),
        )]);
        runner.context_mut().put_event(&Event::debug("account", t0()));
        runner.register(Box::new(Recording {
            label: "seen",
            subscription: Subscription::All,
            log: Rc::clone(&log),
        }));

        runner.run();
        let kinds: Vec<EventKind> = log.borrow().iter().map(|(_, kind)| *kind).collect();
        assert_eq!(kinds, vec![EventKind::Debug, EventKind::TickPrice]);
    }

    #[test]
    fn undecodable_payloads_are_skipped() {
        let mut queue = MemoryQueue::new();
        queue.put("not json").unwrap();
        let mut runner = Runner::new(
            "test",
            RunnerConfig::backtest(),
            Box::new(queue),
            Scripted::new(vec![Event::heart_beat(1, t0())]),
            Vec::new(),
        );

        let stats = runner.run();
        // Only the heartbeat from the source was dispatched.
        assert_eq!(stats.events_dispatched, 1);
    }

    #[test]
    fn heartbeats_are_synthesized_between_passes() {
        struct EmptyCycles {
            remaining: u32,
        }

        impl EventSource for EmptyCycles {
            fn next_event(&mut self) -> Sourced {
                if self.remaining == 0 {
                    return Sourced::Exhausted;
                }
                self.remaining -= 1;
                Sourced::Empty
            }
        }

        let deliveries = Rc::new(RefCell::new(Vec::new()));
        let config = RunnerConfig {
            loop_sleep: Duration::from_millis(5),
            empty_sleep: Duration::ZERO,
            heartbeat_interval: Duration::from_millis(1),
        };
        let mut runner = Runner::new(
            "test",
            config,
            Box::new(MemoryQueue::new()),
            EmptyCycles { remaining: 4 },
            Vec::new(),
        );
        runner.register(Box::new(Recording {
            label: "beats",
            subscription: Subscription::Only(&[EventKind::HeartBeat]),
            log: Rc::clone(&deliveries),
        }));

        let stats = runner.run();
        assert!(stats.heartbeats >= 1, "no heartbeat in {stats:?}");
        assert!(!deliveries.borrow().is_empty());
    }
}
