//! Backtest report: replay counters, candle counts, order summaries.

use std::fmt;
use std::time::Duration;

use quicksilver_core::domain::{Order, OrderSide, Timeframe};
use rust_decimal::Decimal;

/// Snapshot of one simulated order for the end-of-run report.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSummary {
    pub id: u64,
    pub instrument: String,
    pub side: OrderSide,
    pub pips: Decimal,
    /// Realized profit; `None` when the order was still open at the end.
    pub profit: Option<Decimal>,
    pub max_profit: Decimal,
    pub min_profit: Decimal,
    pub profit_time_percent: Decimal,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            instrument: order.instrument.symbol.clone(),
            side: order.side,
            pips: order.pips(),
            profit: order.profit(),
            max_profit: order.max_profit,
            min_profit: order.min_profit,
            profit_time_percent: order.profit_time_percent(),
        }
    }
}

/// End-of-run report for a tick file replay.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestReport {
    /// Tick file lines read, malformed ones included.
    pub lines: u64,
    pub skipped: u64,
    /// Events handed to the handler pass, boundary events included.
    pub events_dispatched: u64,
    /// Candles created per timeframe, in `Timeframe::ALL` order.
    pub candle_counts: Vec<(Timeframe, u64)>,
    pub orders: Vec<OrderSummary>,
    pub elapsed: Duration,
}

impl BacktestReport {
    /// Candles created for one timeframe over the whole run.
    pub fn candles(&self, timeframe: Timeframe) -> u64 {
        self.candle_counts
            .iter()
            .find(|(t, _)| *t == timeframe)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }
}

impl fmt::Display for BacktestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "=".repeat(44))?;
        writeln!(f, "Backtest replay finished in {:.2?}", self.elapsed)?;
        writeln!(f, "Lines:  {} read, {} skipped", self.lines, self.skipped)?;
        writeln!(f, "Events: {} dispatched", self.events_dispatched)?;
        writeln!(f, "{}", "-".repeat(44))?;
        for (timeframe, count) in &self.candle_counts {
            writeln!(f, "{:<12} {:>7} candles", timeframe.label(), count)?;
        }
        writeln!(f, "{}", "-".repeat(44))?;
        if self.orders.is_empty() {
            writeln!(f, "No orders")?;
        }
        for order in &self.orders {
            let state = match order.profit {
                Some(profit) => format!("closed, profit {profit}"),
                None => "open".to_string(),
            };
            writeln!(
                f,
                "#{:<3} {} {:<4} {:>8} pips ({state}), max {} min {}, in profit {}%",
                order.id,
                order.instrument,
                order.side,
                order.pips,
                order.max_profit,
                order.min_profit,
                order.profit_time_percent
            )?;
        }
        write!(f, "{}", "=".repeat(44))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn report() -> BacktestReport {
        BacktestReport {
            lines: 49,
            skipped: 0,
            events_dispatched: 55,
            candle_counts: vec![(Timeframe::Tick, 49), (Timeframe::M1, 5)],
            orders: vec![OrderSummary {
                id: 1,
                instrument: "GBPUSD".to_string(),
                side: OrderSide::Buy,
                pips: dec!(-3.4),
                profit: None,
                max_profit: dec!(4.4),
                min_profit: dec!(-6.9),
                profit_time_percent: dec!(41.67),
            }],
            elapsed: Duration::from_millis(120),
        }
    }

    #[test]
    fn candle_lookup_defaults_to_zero() {
        let report = report();
        assert_eq!(report.candles(Timeframe::M1), 5);
        assert_eq!(report.candles(Timeframe::H1), 0);
    }

    #[test]
    fn display_prints_periods_and_orders() {
        let rendered = report().to_string();
        assert!(rendered.contains("49 read, 0 skipped"));
        assert!(rendered.contains("PERIOD_M1"));
        assert!(rendered.contains("GBPUSD buy"));
        assert!(rendered.contains("(open)"));
    }

    #[test]
    fn display_marks_an_empty_order_list() {
        let mut report = report();
        report.orders.clear();
        assert!(report.to_string().contains("No orders"));
    }
}
