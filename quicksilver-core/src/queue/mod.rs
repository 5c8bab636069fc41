//! Queue transport — byte-string channels feeding the dispatch loop.
//!
//! The loop never talks to a broker directly; it sees [`EventQueue`] and
//! [`StatusSink`]. Backtests plug in the in-process queue, production plugs
//! in Redis.

mod memory;
mod redis;
mod status;

pub use memory::{MemoryQueue, MEMORY_QUEUE_CAPACITY};
pub use redis::{RedisQueue, RedisStatus};
pub use status::{NullStatus, StatusSink, STATUS_TIME_FORMAT};

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("queue full (capacity {capacity})")]
    Full { capacity: usize },
    #[error("transport i/o: {0}")]
    Io(#[from] ::redis::RedisError),
}

/// FIFO channel of encoded events.
///
/// Methods take `&mut self`: the in-process queue mutates its buffer and the
/// Redis client mutates its connection. The loop is single-threaded, so
/// nothing more is needed.
pub trait EventQueue {
    /// Append one payload at the tail.
    fn put(&mut self, item: &str) -> Result<(), TransportError>;

    /// Pop the head payload. `block` waits up to `timeout` for one to arrive
    /// (`None` waits indefinitely) where the transport supports waiting.
    fn get(&mut self, block: bool, timeout: Option<Duration>) -> Result<Option<String>, TransportError>;

    fn len(&mut self) -> Result<usize, TransportError>;

    fn is_empty(&mut self) -> Result<bool, TransportError> {
        Ok(self.len()? == 0)
    }
}
