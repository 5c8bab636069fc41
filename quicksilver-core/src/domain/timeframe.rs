//! Timeframe — aggregation granularities and candle-boundary arithmetic.

use std::fmt;

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Aggregation granularities, shortest to longest.
///
/// `Tick` is the pseudo-timeframe: every tick is its own bucket, so its
/// boundary is the tick timestamp itself and it never produces boundary
/// events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "PERIOD_TICK")]
    Tick,
    #[serde(rename = "PERIOD_M1")]
    M1,
    #[serde(rename = "PERIOD_M5")]
    M5,
    #[serde(rename = "PERIOD_M15")]
    M15,
    #[serde(rename = "PERIOD_M30")]
    M30,
    #[serde(rename = "PERIOD_H1")]
    H1,
    #[serde(rename = "PERIOD_H4")]
    H4,
    #[serde(rename = "PERIOD_D1")]
    D1,
    #[serde(rename = "PERIOD_W1")]
    W1,
}

impl Timeframe {
    /// All timeframes in ascending duration order. The aggregator walks this
    /// array on every tick, so the order is part of the dispatch contract.
    pub const ALL: [Timeframe; 9] = [
        Timeframe::Tick,
        Timeframe::M1,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D1,
        Timeframe::W1,
    ];

    /// Window length, `None` for the tick pseudo-timeframe.
    pub fn duration(self) -> Option<Duration> {
        match self {
            Timeframe::Tick => None,
            Timeframe::M1 => Some(Duration::minutes(1)),
            Timeframe::M5 => Some(Duration::minutes(5)),
            Timeframe::M15 => Some(Duration::minutes(15)),
            Timeframe::M30 => Some(Duration::minutes(30)),
            Timeframe::H1 => Some(Duration::hours(1)),
            Timeframe::H4 => Some(Duration::hours(4)),
            Timeframe::D1 => Some(Duration::days(1)),
            Timeframe::W1 => Some(Duration::weeks(1)),
        }
    }

    /// Floor `t` to the open boundary of the window containing it.
    ///
    /// Weeks start on ISO Monday at midnight. `Tick` is the identity.
    pub fn floor(self, t: NaiveDateTime) -> NaiveDateTime {
        let midnight = t.date().and_time(NaiveTime::MIN);
        match self {
            Timeframe::Tick => t,
            Timeframe::M1 => floor_to_minutes(t, 1),
            Timeframe::M5 => floor_to_minutes(t, 5),
            Timeframe::M15 => floor_to_minutes(t, 15),
            Timeframe::M30 => floor_to_minutes(t, 30),
            Timeframe::H1 => floor_to_minutes(t, 60),
            Timeframe::H4 => floor_to_minutes(t, 240),
            Timeframe::D1 => midnight,
            Timeframe::W1 => midnight - Duration::days(i64::from(t.weekday().num_days_from_monday())),
        }
    }

    /// Period label used on the wire and in reports.
    pub fn label(self) -> &'static str {
        match self {
            Timeframe::Tick => "PERIOD_TICK",
            Timeframe::M1 => "PERIOD_M1",
            Timeframe::M5 => "PERIOD_M5",
            Timeframe::M15 => "PERIOD_M15",
            Timeframe::M30 => "PERIOD_M30",
            Timeframe::H1 => "PERIOD_H1",
            Timeframe::H4 => "PERIOD_H4",
            Timeframe::D1 => "PERIOD_D1",
            Timeframe::W1 => "PERIOD_W1",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn floor_to_minutes(t: NaiveDateTime, step: i64) -> NaiveDateTime {
    let minute_of_day = i64::from(t.num_seconds_from_midnight()) / 60;
    t.date().and_time(NaiveTime::MIN) + Duration::minutes(minute_of_day - minute_of_day % step)
}
