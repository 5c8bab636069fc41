//! Event — the envelope and payload types flowing through the queue.

use std::fmt;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::timeframe::Timeframe;

/// Event payload, discriminated by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventBody {
    /// One bid/ask quote for an instrument.
    TickPrice {
        instrument: String,
        bid: Decimal,
        ask: Decimal,
    },
    /// A candle window closed: `previous_boundary` ended and
    /// `current_boundary` opened.
    TimeFrame {
        timeframe: Timeframe,
        current_boundary: NaiveDateTime,
        previous_boundary: NaiveDateTime,
        timezone_offset: i64,
    },
    /// Loop liveness pulse with a monotonically increasing counter.
    HeartBeat { counter: u64 },
    /// Operator-injected action for the debug loop.
    Debug { action: String },
}

/// Discriminator of an [`EventBody`], used for handler subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    TickPrice,
    TimeFrame,
    HeartBeat,
    Debug,
}

impl EventKind {
    pub fn name(self) -> &'static str {
        match self {
            EventKind::TickPrice => "TickPrice",
            EventKind::TimeFrame => "TimeFrame",
            EventKind::HeartBeat => "HeartBeat",
            EventKind::Debug => "Debug",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Envelope around a payload: the redelivery counter and the event time.
///
/// `tried` counts re-enqueues; fresh events start at zero, and payloads from
/// external producers may omit the field entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(flatten)]
    pub body: EventBody,
    #[serde(default)]
    pub tried: u32,
    pub time: NaiveDateTime,
}

/// Borrowed view of a tick's fields, for handlers and the order path.
#[derive(Debug, Clone, Copy)]
pub struct TickView<'a> {
    pub instrument: &'a str,
    pub bid: Decimal,
    pub ask: Decimal,
    pub time: NaiveDateTime,
}

impl Event {
    pub fn new(body: EventBody, time: NaiveDateTime) -> Self {
        Self { body, tried: 0, time }
    }

    pub fn tick_price(
        instrument: impl Into<String>,
        bid: Decimal,
        ask: Decimal,
        time: NaiveDateTime,
    ) -> Self {
        Self::new(EventBody::TickPrice { instrument: instrument.into(), bid, ask }, time)
    }

    pub fn time_frame(
        timeframe: Timeframe,
        current_boundary: NaiveDateTime,
        previous_boundary: NaiveDateTime,
        timezone_offset: i64,
        time: NaiveDateTime,
    ) -> Self {
        Self::new(
            EventBody::TimeFrame { timeframe, current_boundary, previous_boundary, timezone_offset },
            time,
        )
    }

    pub fn heart_beat(counter: u64, time: NaiveDateTime) -> Self {
        Self::new(EventBody::HeartBeat { counter }, time)
    }

    pub fn debug(action: impl Into<String>, time: NaiveDateTime) -> Self {
        Self::new(EventBody::Debug { action: action.into() }, time)
    }

    pub fn kind(&self) -> EventKind {
        match self.body {
            EventBody::TickPrice { .. } => EventKind::TickPrice,
            EventBody::TimeFrame { .. } => EventKind::TimeFrame,
            EventBody::HeartBeat { .. } => EventKind::HeartBeat,
            EventBody::Debug { .. } => EventKind::Debug,
        }
    }

    /// Borrow the tick fields when this is a `TickPrice` event.
    pub fn as_tick(&self) -> Option<TickView<'_>> {
        match &self.body {
            EventBody::TickPrice { instrument, bid, ask } => {
                Some(TickView { instrument, bid: *bid, ask: *ask, time: self.time })
            }
            _ => None,
        }
    }
}
