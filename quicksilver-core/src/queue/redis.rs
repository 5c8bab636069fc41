//! Redis-backed queue and status store for production loops.

use std::time::Duration;

use chrono::{NaiveDateTime, Utc};
use redis::{Client, Commands, Connection};

use super::status::{StatusSink, STATUS_TIME_FORMAT};
use super::{EventQueue, TransportError};

const LAST_TICK_TIME_KEY: &str = "LAST_TICK_TIME";
const HEARTBEAT_KEY: &str = "HEARTBEAT";

/// Durable FIFO on a Redis list. Each named queue lives under
/// `queue:<name>`, so external producers can feed the loop with plain
/// RPUSH.
pub struct RedisQueue {
    conn: Connection,
    key: String,
}

impl RedisQueue {
    /// Connect to `redis://host:port/db` and bind the named queue.
    pub fn connect(url: &str, name: &str) -> Result<Self, TransportError> {
        let client = Client::open(url)?;
        let conn = client.get_connection()?;
        Ok(Self { conn, key: format!("queue:{name}") })
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl EventQueue for RedisQueue {
    fn put(&mut self, item: &str) -> Result<(), TransportError> {
        if item.is_empty() {
            return Ok(());
        }
        self.conn.rpush::<_, _, ()>(&self.key, item)?;
        Ok(())
    }

    fn get(&mut self, block: bool, timeout: Option<Duration>) -> Result<Option<String>, TransportError> {
        if block {
            // BLPOP with a zero timeout waits indefinitely.
            let timeout = timeout.map(|t| t.as_secs_f64()).unwrap_or(0.0);
            let popped: Option<(String, String)> = self.conn.blpop(&self.key, timeout)?;
            Ok(popped.map(|(_, value)| value))
        } else {
            Ok(self.conn.lpop(&self.key, None)?)
        }
    }

    fn len(&mut self) -> Result<usize, TransportError> {
        Ok(self.conn.llen(&self.key)?)
    }
}

/// Status keys written for the monitoring side: last tick time and a
/// heartbeat stamp, both in [`STATUS_TIME_FORMAT`].
pub struct RedisStatus {
    conn: Connection,
}

impl RedisStatus {
    pub fn connect(url: &str) -> Result<Self, TransportError> {
        let client = Client::open(url)?;
        let conn = client.get_connection()?;
        Ok(Self { conn })
    }
}

impl StatusSink for RedisStatus {
    fn set_last_tick(&mut self, time: NaiveDateTime) -> Result<(), TransportError> {
        let stamp = time.format(STATUS_TIME_FORMAT).to_string();
        self.conn.set::<_, _, ()>(LAST_TICK_TIME_KEY, stamp)?;
        Ok(())
    }

    fn set_heartbeat(&mut self) -> Result<(), TransportError> {
        let stamp = Utc::now().naive_utc().format(STATUS_TIME_FORMAT).to_string();
        self.conn.set::<_, _, ()>(HEARTBEAT_KEY, stamp)?;
        Ok(())
    }

    fn last_tick(&mut self) -> Result<Option<String>, TransportError> {
        Ok(self.conn.get(LAST_TICK_TIME_KEY)?)
    }
}
