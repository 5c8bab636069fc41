//! Domain types for Quicksilver

pub mod account;
pub mod candle;
pub mod event;
pub mod instrument;
pub mod order;
pub mod timeframe;

pub use account::Account;
pub use candle::{Candle, CandleRing, CandleTimeline, OHLC_RING_CAPACITY, TICK_RING_CAPACITY};
pub use event::{Event, EventBody, EventKind, TickView};
pub use instrument::{normalize_symbol, Instrument};
pub use order::{Order, OrderSide, PriceInputError, PriceOrPips, SideParseError};
pub use timeframe::Timeframe;
