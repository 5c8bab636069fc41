//! Candle — bid/ask OHLC windows and the rolling per-timeframe timeline.

use std::collections::{HashMap, VecDeque};

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::timeframe::Timeframe;

/// Ring capacity for the tick pseudo-timeframe.
pub const TICK_RING_CAPACITY: usize = 2000;
/// Ring capacity for every real timeframe.
pub const OHLC_RING_CAPACITY: usize = 50;

/// One OHLC window with separate bid and ask tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Open boundary of the window this candle belongs to.
    pub time: NaiveDateTime,
    pub open_bid: Decimal,
    pub open_ask: Decimal,
    pub high_bid: Decimal,
    pub high_ask: Decimal,
    pub low_bid: Decimal,
    pub low_ask: Decimal,
    pub close_bid: Decimal,
    pub close_ask: Decimal,
}

impl Candle {
    /// A fresh candle seeded from the first tick of its window: all four
    /// prices per track start at that tick.
    pub fn seed(time: NaiveDateTime, bid: Decimal, ask: Decimal) -> Self {
        Self {
            time,
            open_bid: bid,
            open_ask: ask,
            high_bid: bid,
            high_ask: ask,
            low_bid: bid,
            low_ask: ask,
            close_bid: bid,
            close_ask: ask,
        }
    }

    /// Fold one more tick in: extend the extremes, overwrite the close.
    pub fn apply(&mut self, bid: Decimal, ask: Decimal) {
        self.high_bid = self.high_bid.max(bid);
        self.high_ask = self.high_ask.max(ask);
        self.low_bid = self.low_bid.min(bid);
        self.low_ask = self.low_ask.min(ask);
        self.close_bid = bid;
        self.close_ask = ask;
    }
}

/// Bounded series of candles for one (timeframe, instrument) pair.
///
/// Old candles fall off the front once the ring is full; `created` keeps the
/// lifetime total so reports stay accurate after wraparound.
#[derive(Debug, Clone)]
pub struct CandleRing {
    candles: VecDeque<Candle>,
    capacity: usize,
    created: u64,
}

impl CandleRing {
    fn new(capacity: usize) -> Self {
        Self { candles: VecDeque::with_capacity(capacity.min(64)), capacity, created: 0 }
    }

    fn apply(&mut self, boundary: NaiveDateTime, bid: Decimal, ask: Decimal) {
        match self.candles.back_mut() {
            Some(last) if last.time == boundary => last.apply(bid, ask),
            _ => {
                self.candles.push_back(Candle::seed(boundary, bid, ask));
                self.created += 1;
                if self.candles.len() > self.capacity {
                    self.candles.pop_front();
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Lifetime count of candles opened, including ones the ring dropped.
    pub fn created(&self) -> u64 {
        self.created
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candle> {
        self.candles.iter()
    }
}

/// Rolling candle state for all timeframes: the open boundary per timeframe
/// plus the candle rings keyed by (timeframe, instrument).
#[derive(Debug, Clone, Default)]
pub struct CandleTimeline {
    boundaries: HashMap<Timeframe, NaiveDateTime>,
    series: HashMap<Timeframe, HashMap<String, CandleRing>>,
}

impl CandleTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open boundary currently recorded for `timeframe`, if any tick or
    /// heartbeat has been seen since startup.
    pub fn boundary(&self, timeframe: Timeframe) -> Option<NaiveDateTime> {
        self.boundaries.get(&timeframe).copied()
    }

    pub fn set_boundary(&mut self, timeframe: Timeframe, boundary: NaiveDateTime) {
        self.boundaries.insert(timeframe, boundary);
    }

    /// Fold a tick into the candle for `boundary`, opening a new candle when
    /// the boundary advanced.
    pub fn apply_tick(
        &mut self,
        timeframe: Timeframe,
        boundary: NaiveDateTime,
        instrument: &str,
        bid: Decimal,
        ask: Decimal,
    ) {
        let by_symbol = self.series.entry(timeframe).or_default();
        if let Some(ring) = by_symbol.get_mut(instrument) {
            ring.apply(boundary, bid, ask);
        } else {
            let capacity = match timeframe {
                Timeframe::Tick => TICK_RING_CAPACITY,
                _ => OHLC_RING_CAPACITY,
            };
            let mut ring = CandleRing::new(capacity);
            ring.apply(boundary, bid, ask);
            by_symbol.insert(instrument.to_string(), ring);
        }
    }

    pub fn ring(&self, timeframe: Timeframe, instrument: &str) -> Option<&CandleRing> {
        self.series.get(&timeframe)?.get(instrument)
    }

    pub fn last_candle(&self, timeframe: Timeframe, instrument: &str) -> Option<&Candle> {
        self.ring(timeframe, instrument)?.last()
    }

    /// Lifetime candle count for `timeframe` across all instruments.
    pub fn candles_created(&self, timeframe: Timeframe) -> u64 {
        self.series
            .get(&timeframe)
            .map(|by_symbol| by_symbol.values().map(CandleRing::created).sum())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn minute(m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2018, 12, 3).unwrap().and_hms_opt(4, m, 0).unwrap()
    }

    #[test]
    fn same_boundary_extends_one_candle() {
        let mut timeline = CandleTimeline::new();
        let boundary = minute(41);
        timeline.apply_tick(Timeframe::M1, boundary, "GBPUSD", dec!(1.2721), dec!(1.2726));
        timeline.apply_tick(Timeframe::M1, boundary, "GBPUSD", dec!(1.2731), dec!(1.2736));
        timeline.apply_tick(Timeframe::M1, boundary, "GBPUSD", dec!(1.2711), dec!(1.2716));

        let ring = timeline.ring(Timeframe::M1, "GBPUSD").unwrap();
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.created(), 1);
        let candle = ring.last().unwrap();
        assert_eq!(candle.open_bid, dec!(1.2721));
        assert_eq!(candle.high_bid, dec!(1.2731));
        assert_eq!(candle.low_bid, dec!(1.2711));
        assert_eq!(candle.close_bid, dec!(1.2711));
        assert_eq!(candle.close_ask, dec!(1.2716));
    }

    #[test]
    fn advanced_boundary_opens_new_candle() {
        let mut timeline = CandleTimeline::new();
        timeline.apply_tick(Timeframe::M1, minute(41), "GBPUSD", dec!(1.2721), dec!(1.2726));
        timeline.apply_tick(Timeframe::M1, minute(42), "GBPUSD", dec!(1.2723), dec!(1.2728));

        let ring = timeline.ring(Timeframe::M1, "GBPUSD").unwrap();
        assert_eq!(ring.len(), 2);
        let previous = ring.iter().next().unwrap();
        assert_eq!(previous.close_bid, dec!(1.2721));
        let fresh = ring.last().unwrap();
        assert_eq!(fresh.time, minute(42));
        assert_eq!(fresh.open_bid, dec!(1.2723));
    }

    #[test]
    fn ring_caps_but_keeps_created_total() {
        let mut timeline = CandleTimeline::new();
        for m in 0..60 {
            timeline.apply_tick(Timeframe::M1, minute(m), "GBPUSD", dec!(1.2), dec!(1.3));
        }
        let ring = timeline.ring(Timeframe::M1, "GBPUSD").unwrap();
        assert_eq!(ring.len(), OHLC_RING_CAPACITY);
        assert_eq!(ring.created(), 60);
        assert_eq!(timeline.candles_created(Timeframe::M1), 60);
    }

    #[test]
    fn instruments_keep_separate_rings() {
        let mut timeline = CandleTimeline::new();
        timeline.apply_tick(Timeframe::M1, minute(41), "GBPUSD", dec!(1.27), dec!(1.28));
        timeline.apply_tick(Timeframe::M1, minute(41), "EURUSD", dec!(1.13), dec!(1.14));

        assert_eq!(timeline.ring(Timeframe::M1, "GBPUSD").unwrap().len(), 1);
        assert_eq!(timeline.ring(Timeframe::M1, "EURUSD").unwrap().len(), 1);
        assert_eq!(timeline.candles_created(Timeframe::M1), 2);
    }
}
