//! Tick files — CSV quote history as a backtest event source.
//!
//! Line format: `INSTRUMENT,YYYYMMDD HH:MM:SS.ffffff,BID,ASK`. Symbols may
//! carry separators (`GBP/USD`); they are normalized on the way in.

use std::fs::File;
use std::path::Path;

use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{normalize_symbol, Event};
use crate::engine::{EventSource, Sourced};

/// Timestamp layout inside tick files: `20181203 04:41:31.577`.
pub const TICK_TIME_FORMAT: &str = "%Y%m%d %H:%M:%S%.f";

/// Progress log cadence, in lines.
const PRINT_STEP: u64 = 10_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected 4 fields, found {0}")]
    FieldCount(usize),
    #[error("empty instrument")]
    EmptyInstrument,
    #[error("bad timestamp '{0}'")]
    Timestamp(String),
    #[error("bad price '{0}'")]
    Price(String),
}

/// Parse one tick record into a `TickPrice` event.
pub fn record_to_event(record: &StringRecord) -> Result<Event, ParseError> {
    if record.len() != 4 {
        return Err(ParseError::FieldCount(record.len()));
    }
    let raw_symbol = record[0].trim();
    if raw_symbol.is_empty() {
        return Err(ParseError::EmptyInstrument);
    }
    let instrument = normalize_symbol(raw_symbol);
    let time = NaiveDateTime::parse_from_str(record[1].trim(), TICK_TIME_FORMAT)
        .map_err(|_| ParseError::Timestamp(record[1].to_string()))?;
    let bid =
        record[2].trim().parse::<Decimal>().map_err(|_| ParseError::Price(record[2].to_string()))?;
    let ask =
        record[3].trim().parse::<Decimal>().map_err(|_| ParseError::Price(record[3].to_string()))?;
    Ok(Event::tick_price(instrument, bid, ask, time))
}

/// Streaming tick file source. Malformed lines are logged, counted, and
/// skipped; the replay never aborts mid-file.
pub struct TickFile {
    records: StringRecordsIntoIter<File>,
    line_count: u64,
    skipped: u64,
}

impl TickFile {
    pub fn open(path: &Path) -> Result<Self, std::io::Error> {
        let file = File::open(path)?;
        let reader = ReaderBuilder::new().has_headers(false).flexible(true).from_reader(file);
        Ok(Self { records: reader.into_records(), line_count: 0, skipped: 0 })
    }

    /// Lines read so far, malformed ones included.
    pub fn line_count(&self) -> u64 {
        self.line_count
    }

    /// Lines that did not yield an event.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

impl EventSource for TickFile {
    fn next_event(&mut self) -> Sourced {
        loop {
            let record = match self.records.next() {
                Some(Ok(record)) => record,
                Some(Err(err)) => {
                    self.skipped += 1;
                    warn!(error = %err, "unreadable tick record, skipping");
                    continue;
                }
                None => return Sourced::Exhausted,
            };
            self.line_count += 1;
            if self.line_count % PRINT_STEP == 0 {
                info!(lines = self.line_count, "tick lines processed");
            }
            match record_to_event(&record) {
                Ok(event) => return Sourced::Event(event),
                Err(err) => {
                    self.skipped += 1;
                    warn!(line = self.line_count, error = %err, "malformed tick line, skipping");
                }
            }
        }
    }
}
