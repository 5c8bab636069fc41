//! Status sink — liveness side-channel for external monitoring.

use chrono::NaiveDateTime;

use super::TransportError;

/// Timestamp layout the monitoring consumers parse: second and microsecond
/// parts both colon-separated.
pub const STATUS_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S:%6f";

/// Where liveness markers go: the time of the last tick seen and a heartbeat
/// stamp refreshed by the loop.
pub trait StatusSink {
    fn set_last_tick(&mut self, time: NaiveDateTime) -> Result<(), TransportError>;

    fn set_heartbeat(&mut self) -> Result<(), TransportError>;

    /// The last recorded tick time, verbatim as stored.
    fn last_tick(&mut self) -> Result<Option<String>, TransportError>;
}

/// Sink that remembers nothing. Debug loops and backtests use it so handler
/// wiring stays identical across modes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStatus;

impl StatusSink for NullStatus {
    fn set_last_tick(&mut self, _time: NaiveDateTime) -> Result<(), TransportError> {
        Ok(())
    }

    fn set_heartbeat(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn last_tick(&mut self) -> Result<Option<String>, TransportError> {
        Ok(None)
    }
}
