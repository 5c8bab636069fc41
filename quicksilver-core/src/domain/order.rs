//! Order — simulated positions: pip economics, watermarks, close freezing.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::instrument::Instrument;

/// Profit multiplier per pip per lot.
const PIP_VALUE_PER_LOT: Decimal = Decimal::TEN;

/// Direction of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// The opposite side. Stop-losses sit on this side of the open price.
    pub fn reverse(self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // pad() so report columns can align sides.
        match self {
            OrderSide::Buy => f.pad("buy"),
            OrderSide::Sell => f.pad("sell"),
        }
    }
}

#[derive(Debug, Error)]
#[error("invalid order side '{0}', expected buy or sell")]
pub struct SideParseError(String);

impl FromStr for OrderSide {
    type Err = SideParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(OrderSide::Buy),
            "sell" => Ok(OrderSide::Sell),
            _ => Err(SideParseError(s.to_string())),
        }
    }
}

/// A take-profit or stop-loss target: either an absolute price level or a
/// pip distance from the open price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PriceOrPips {
    Absolute(Decimal),
    Pips(Decimal),
}

impl PriceOrPips {
    /// Resolve to a concrete price. `side` is the direction the target sits
    /// in relative to `base`: the order side for take-profits, the reverse
    /// side for stop-losses.
    pub fn resolve(self, instrument: &Instrument, base: Decimal, side: OrderSide) -> Decimal {
        match self {
            PriceOrPips::Absolute(price) => price,
            PriceOrPips::Pips(pips) => instrument.offset_price(base, side, pips),
        }
    }
}

#[derive(Debug, Error)]
#[error("invalid price or pip distance '{0}'")]
pub struct PriceInputError(String);

impl FromStr for PriceOrPips {
    type Err = PriceInputError;

    /// Textual convention from order tickets: a decimal point means an
    /// absolute price, a bare number means pips.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value = Decimal::from_str(trimmed).map_err(|_| PriceInputError(s.to_string()))?;
        if trimmed.contains('.') {
            Ok(PriceOrPips::Absolute(value))
        } else {
            Ok(PriceOrPips::Pips(value))
        }
    }
}

/// A simulated market position.
///
/// Watermarks and the time-in-profit clock advance on every matching tick;
/// once closed the order freezes and further ticks are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: u64,
    pub instrument: Instrument,
    pub side: OrderSide,
    pub lots: Decimal,
    pub open_time: NaiveDateTime,
    pub open_price: Decimal,
    pub take_profit: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub current_price: Decimal,
    pub current_time: NaiveDateTime,
    pub close_price: Option<Decimal>,
    pub close_time: Option<NaiveDateTime>,
    /// Highest profit in pips seen over the order's life, starting at zero.
    pub max_profit: Decimal,
    /// Lowest profit in pips seen over the order's life, starting at zero.
    pub min_profit: Decimal,
    /// Accumulated wall time the order spent with positive profit.
    pub profit_time: Duration,
}

impl Order {
    pub(crate) fn open(
        id: u64,
        instrument: Instrument,
        side: OrderSide,
        lots: Decimal,
        open_price: Decimal,
        take_profit: Option<Decimal>,
        stop_loss: Option<Decimal>,
        time: NaiveDateTime,
    ) -> Self {
        Self {
            id,
            instrument,
            side,
            lots,
            open_time: time,
            open_price,
            take_profit,
            stop_loss,
            current_price: open_price,
            current_time: time,
            close_price: None,
            close_time: None,
            max_profit: Decimal::ZERO,
            min_profit: Decimal::ZERO,
            profit_time: Duration::zero(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.close_price.is_some()
    }

    /// Current profit in pips, measured against the close price once closed.
    pub fn pips(&self) -> Decimal {
        let reference = self.close_price.unwrap_or(self.current_price);
        self.instrument.profit_pips(self.open_price, reference, self.side)
    }

    /// Realized profit in account currency; `None` while the order is open.
    pub fn profit(&self) -> Option<Decimal> {
        if self.is_closed() {
            Some(self.pips() * self.lots * PIP_VALUE_PER_LOT)
        } else {
            None
        }
    }

    /// Fold a tick in: move the mark price, advance the watermarks and the
    /// time-in-profit clock. Ticks for other instruments, and any tick after
    /// the close, change nothing.
    pub fn update_price(&mut self, instrument: &str, bid: Decimal, ask: Decimal, time: NaiveDateTime) {
        if self.is_closed() || self.instrument.symbol != instrument {
            return;
        }
        let previous_time = self.current_time;
        self.current_price = match self.side {
            OrderSide::Buy => bid,
            OrderSide::Sell => ask,
        };
        self.current_time = time;

        let pips = self.pips();
        if pips > self.max_profit {
            self.max_profit = pips;
        }
        if pips < self.min_profit {
            self.min_profit = pips;
        }
        if pips > Decimal::ZERO {
            self.profit_time = self.profit_time + (time - previous_time);
        }
    }

    /// Close at the tick's price for this side. A second close is a no-op.
    pub fn close(&mut self, instrument: &str, bid: Decimal, ask: Decimal, time: NaiveDateTime) {
        if self.is_closed() || self.instrument.symbol != instrument {
            return;
        }
        let price = match self.side {
            OrderSide::Buy => bid,
            OrderSide::Sell => ask,
        };
        self.current_price = price;
        self.current_time = time;
        self.close_price = Some(price);
        self.close_time = Some(time);
    }

    /// Wall time from open to the latest update.
    pub fn total_time(&self) -> Duration {
        self.current_time - self.open_time
    }

    /// Share of the order's life spent in profit, as a percentage rounded to
    /// two decimals. Zero when no time has passed at all.
    pub fn profit_time_percent(&self) -> Decimal {
        let total = duration_micros(self.total_time());
        if total <= 0 {
            return Decimal::ZERO;
        }
        let in_profit = Decimal::from(duration_micros(self.profit_time));
        (in_profit / Decimal::from(total) * Decimal::ONE_HUNDRED).round_dp(2)
    }
}

/// Microseconds in `d`, falling back to millisecond resolution on the
/// (centuries-long) overflow case.
fn duration_micros(d: Duration) -> i64 {
    d.num_microseconds().unwrap_or_else(|| d.num_milliseconds().saturating_mul(1000))
}
