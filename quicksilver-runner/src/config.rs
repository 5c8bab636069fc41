//! Environment-driven runtime settings.
//!
//! Every knob has a default, so a bare environment boots a debug loop
//! against a local Redis. Unparseable values fall back to their default
//! with a warning instead of failing the boot.

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use quicksilver_core::engine::RunnerConfig;
use tracing::warn;

/// Connection coordinates for the durable queue and the status store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    pub db: u32,
}

impl RedisSettings {
    pub fn url(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.db)
    }
}

/// Runtime settings for the queue loops.
///
/// Environment variables, all optional: `DEBUG`, `REDIS_HOST`,
/// `REDIS_PORT`, `REDIS_DB`, `QUEUE_NAME`, `LOOP_SLEEP` (seconds),
/// `EMPTY_SLEEP` (seconds), `HEARTBEAT` (seconds, 0 disables),
/// `TIMEZONE` (whole hours).
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Debug mode: status handlers log locally instead of writing to the
    /// status store.
    pub debug: bool,
    pub redis: RedisSettings,
    pub queue_name: String,
    pub loop_sleep: Duration,
    pub empty_sleep: Duration,
    pub heartbeat_interval: Duration,
    /// Aggregator wall-clock offset in whole hours.
    pub timezone_offset: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,
            redis: RedisSettings { host: "127.0.0.1".to_string(), port: 6379, db: 7 },
            queue_name: "quicksilver".to_string(),
            loop_sleep: Duration::from_millis(100),
            empty_sleep: Duration::from_millis(500),
            heartbeat_interval: Duration::from_secs(5),
            timezone_offset: 0,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let defaults = Settings::default();
        Settings {
            debug: bool_env_or("DEBUG", defaults.debug),
            redis: RedisSettings {
                host: env::var("REDIS_HOST").unwrap_or(defaults.redis.host),
                port: env_or("REDIS_PORT", defaults.redis.port),
                db: env_or("REDIS_DB", defaults.redis.db),
            },
            queue_name: env::var("QUEUE_NAME").unwrap_or(defaults.queue_name),
            loop_sleep: secs_env_or("LOOP_SLEEP", defaults.loop_sleep),
            empty_sleep: secs_env_or("EMPTY_SLEEP", defaults.empty_sleep),
            heartbeat_interval: secs_env_or("HEARTBEAT", defaults.heartbeat_interval),
            timezone_offset: env_or("TIMEZONE", defaults.timezone_offset),
        }
    }

    /// Loop timing for the queue-fed runners.
    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            loop_sleep: self.loop_sleep,
            empty_sleep: self.empty_sleep,
            heartbeat_interval: self.heartbeat_interval,
        }
    }
}

fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(var = key, value = %raw, %default, "unparseable setting, using default");
                default
            }
        },
        Err(_) => default,
    }
}

fn bool_env_or(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                warn!(var = key, value = %raw, default, "unparseable flag, using default");
                default
            }
        },
        Err(_) => default,
    }
}

fn secs_env_or(key: &str, default: Duration) -> Duration {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<f64>() {
            Ok(secs) if secs.is_finite() && secs >= 0.0 => Duration::from_secs_f64(secs),
            _ => {
                warn!(
                    var = key,
                    value = %raw,
                    default_secs = default.as_secs_f64(),
                    "unparseable interval, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}
