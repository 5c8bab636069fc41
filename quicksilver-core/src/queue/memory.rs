//! In-process bounded queue for backtests and tests.

use std::collections::VecDeque;
use std::time::Duration;

use super::{EventQueue, TransportError};

/// Default bound. Matches the tick ring: a backtest that outruns its
/// consumers by this much is broken, not slow.
pub const MEMORY_QUEUE_CAPACITY: usize = 2000;

#[derive(Debug, Clone)]
pub struct MemoryQueue {
    items: VecDeque<String>,
    capacity: usize,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::with_capacity(MEMORY_QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { items: VecDeque::new(), capacity }
    }
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue for MemoryQueue {
    fn put(&mut self, item: &str) -> Result<(), TransportError> {
        if self.items.len() >= self.capacity {
            return Err(TransportError::Full { capacity: self.capacity });
        }
        self.items.push_back(item.to_string());
        Ok(())
    }

    /// `block` is accepted for contract parity and ignored: producer and
    /// consumer share one thread here, so waiting could never be satisfied.
    fn get(&mut self, _block: bool, _timeout: Option<Duration>) -> Result<Option<String>, TransportError> {
        Ok(self.items.pop_front())
    }

    fn len(&mut self) -> Result<usize, TransportError> {
        Ok(self.items.len())
    }
}
