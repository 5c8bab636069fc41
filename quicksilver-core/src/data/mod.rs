//! Data ingest: tick history files.

pub mod tick_file;

pub use tick_file::{record_to_event, ParseError, TickFile, TICK_TIME_FORMAT};
