//! Handler contract — subscriptions, outcomes, and the failure type.

use std::error::Error as StdError;

use thiserror::Error;

use crate::domain::{Event, EventKind};

use super::runner::Context;

/// Which event kinds a handler wants delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscription {
    /// Every event regardless of kind.
    All,
    Only(&'static [EventKind]),
}

impl Subscription {
    pub fn accepts(&self, kind: EventKind) -> bool {
        match self {
            Subscription::All => true,
            Subscription::Only(kinds) => kinds.contains(&kind),
        }
    }
}

/// What a handler decided about the event it was given.
///
/// `Retry` asks the loop to redeliver the whole event to every subscriber;
/// the retry budget is enforced centrally, never per handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Consumed,
    Retry,
}

/// A failure inside one handler's `process`.
///
/// Failures are isolated: the loop logs them (with the source chain) and
/// moves on to the next handler. They are not retries.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), source: None }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self { message: message.into(), source: Some(Box::new(source)) }
    }
}

/// A subscriber in the dispatch registry.
///
/// Handlers run strictly in registration order and receive `&mut Context`
/// to enqueue follow-up events, touch accounts, or read the candle
/// timeline.
pub trait Handler {
    /// Stable name used in startup and failure logs.
    fn name(&self) -> &'static str;

    fn subscription(&self) -> Subscription;

    fn process(&mut self, event: &Event, ctx: &mut Context) -> Result<ProcessOutcome, HandlerError>;
}

/// Render an error and up to `limit` entries of its source chain.
pub(crate) fn source_chain(err: &dyn StdError, limit: usize) -> Vec<String> {
    let mut chain = vec![err.to_string()];
    let mut current = err.source();
    while let Some(source) = current {
        if chain.len() >= limit {
            break;
        }
        chain.push(source.to_string());
        current = source.source();
    }
    chain
}
