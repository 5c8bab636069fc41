//! Account — order registry and the tick fan-out path.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::info;

use super::event::TickView;
use super::instrument::Instrument;
use super::order::{Order, OrderSide, PriceOrPips};

/// A simulated trading account. Orders get sequential ids scoped to the
/// account, starting at 1.
#[derive(Debug, Clone, Default)]
pub struct Account {
    orders: BTreeMap<u64, Order>,
    sequence: u64,
}

impl Account {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a market order at the tick's ask (buys) or bid (sells).
    ///
    /// Take-profit and stop-loss accept absolute prices or pip distances;
    /// pip distances resolve from the open price, take-profits in the order's
    /// profit direction and stop-losses in the reverse direction.
    pub fn market_order(
        &mut self,
        instrument: &str,
        side: OrderSide,
        lots: Decimal,
        take_profit: Option<PriceOrPips>,
        stop_loss: Option<PriceOrPips>,
        tick: TickView<'_>,
    ) -> &Order {
        let instrument = Instrument::resolve(instrument);
        let open_price = match side {
            OrderSide::Buy => tick.ask,
            OrderSide::Sell => tick.bid,
        };
        let take_profit = take_profit.map(|t| t.resolve(&instrument, open_price, side));
        let stop_loss = stop_loss.map(|s| s.resolve(&instrument, open_price, side.reverse()));

        self.sequence += 1;
        let id = self.sequence;
        let order =
            Order::open(id, instrument, side, lots, open_price, take_profit, stop_loss, tick.time);
        info!(
            order = id,
            instrument = %order.instrument.symbol,
            side = %side,
            lots = %lots,
            price = %open_price,
            "market order opened"
        );
        self.orders.entry(id).or_insert(order)
    }

    /// Route one tick to every order. Closed orders and foreign instruments
    /// are filtered inside the order itself.
    pub fn update_tick(&mut self, tick: TickView<'_>) {
        for order in self.orders.values_mut() {
            order.update_price(tick.instrument, tick.bid, tick.ask, tick.time);
        }
    }

    /// Close one order at the tick's price. Unknown ids are ignored.
    pub fn close_order(&mut self, id: u64, tick: TickView<'_>) {
        if let Some(order) = self.orders.get_mut(&id) {
            order.close(tick.instrument, tick.bid, tick.ask, tick.time);
            info!(order = id, price = %order.current_price, "order closed");
        }
    }

    pub fn get_order(&self, id: u64) -> Option<&Order> {
        self.orders.get(&id)
    }

    /// All orders in id order.
    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    pub fn open_orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values().filter(|order| !order.is_closed())
    }

    pub fn closed_orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values().filter(|order| order.is_closed())
    }

    /// Sum of realized profits across closed orders.
    pub fn realized_profit(&self) -> Decimal {
        self.closed_orders().filter_map(Order::profit).sum()
    }

    /// One-line account summary for the debug `account` action.
    pub fn log_summary(&self) {
        info!(
            orders = self.orders.len(),
            open = self.open_orders().count(),
            closed = self.closed_orders().count(),
            realized = %self.realized_profit(),
            "account"
        );
    }

    /// Per-trade lines for the debug `trade` action.
    pub fn log_trades(&self) {
        for order in self.closed_orders() {
            info!(
                order = order.id,
                instrument = %order.instrument.symbol,
                side = %order.side,
                pips = %order.pips(),
                profit = %order.profit().unwrap_or(Decimal::ZERO),
                max = %order.max_profit,
                min = %order.min_profit,
                in_profit_pct = %order.profit_time_percent(),
                "trade"
            );
        }
    }

    /// Per-order lines for the debug `order` action.
    pub fn log_orders(&self) {
        for order in self.open_orders() {
            info!(
                order = order.id,
                instrument = %order.instrument.symbol,
                side = %order.side,
                price = %order.current_price,
                pips = %order.pips(),
                "order"
            );
        }
    }
}
