//! Instrument — symbol normalization and pip arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::order::OrderSide;

/// Canonical symbol form: uppercase, separators stripped.
///
/// Feed files and brokers disagree on spelling (`GBP/USD`, `gbp_usd`,
/// `GBPUSD`); everything downstream uses this form.
pub fn normalize_symbol(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// A tradable instrument with its pip precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    /// Decimal places of one pip: 4 for most FX pairs (0.0001), 2 for JPY
    /// crosses (0.01).
    pub pip_precision: u32,
}

impl Instrument {
    /// Build an instrument from any symbol spelling, deriving the pip
    /// precision from the quote currency.
    pub fn resolve(raw: &str) -> Self {
        let symbol = normalize_symbol(raw);
        let pip_precision = if symbol.ends_with("JPY") { 2 } else { 4 };
        Self { symbol, pip_precision }
    }

    /// Price value of one pip, `10^-pip_precision`.
    pub fn pip_unit(&self) -> Decimal {
        Decimal::new(1, self.pip_precision)
    }

    /// Signed profit in pips for a position opened at `open` and quoted at
    /// `current`. Buys profit when the price rises, sells when it falls.
    pub fn profit_pips(&self, open: Decimal, current: Decimal, side: OrderSide) -> Decimal {
        let delta = match side {
            OrderSide::Buy => current - open,
            OrderSide::Sell => open - current,
        };
        delta / self.pip_unit()
    }

    /// Price at `pips` pips in the profit direction of `side` from `base`.
    pub fn offset_price(&self, base: Decimal, side: OrderSide, pips: Decimal) -> Decimal {
        match side {
            OrderSide::Buy => base + pips * self.pip_unit(),
            OrderSide::Sell => base - pips * self.pip_unit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn normalizes_symbol_spellings() {
        assert_eq!(normalize_symbol("GBP/USD"), "GBPUSD");
        assert_eq!(normalize_symbol("gbp_usd"), "GBPUSD");
        assert_eq!(normalize_symbol("eur-usd"), "EURUSD");
        assert_eq!(normalize_symbol("USDJPY"), "USDJPY");
    }

    #[test]
    fn jpy_crosses_quote_two_pip_decimals() {
        assert_eq!(Instrument::resolve("usd/jpy").pip_precision, 2);
        assert_eq!(Instrument::resolve("EURUSD").pip_precision, 4);
        assert_eq!(Instrument::resolve("EURUSD").pip_unit(), dec!(0.0001));
        assert_eq!(Instrument::resolve("USDJPY").pip_unit(), dec!(0.01));
    }

    #[test]
    fn profit_pips_is_exact() {
        let eurusd = Instrument::resolve("EURUSD");
        let pips = eurusd.profit_pips(dec!(1.3245), dec!(1.32552), OrderSide::Buy);
        assert_eq!(pips, dec!(10.2));
        let pips = eurusd.profit_pips(dec!(1.3245), dec!(1.32552), OrderSide::Sell);
        assert_eq!(pips, dec!(-10.2));
    }

    #[test]
    fn offset_price_follows_side_direction() {
        let eurusd = Instrument::resolve("EURUSD");
        assert_eq!(eurusd.offset_price(dec!(1.1333), OrderSide::Buy, dec!(33)), dec!(1.1366));
        assert_eq!(eurusd.offset_price(dec!(1.1333), OrderSide::Sell, dec!(22)), dec!(1.1311));
    }
}
