//! Bus codec — JSON wire form for events crossing the queue.
//!
//! Every event is one self-describing JSON object: the payload fields plus
//! `type`, `tried` and `time`. Producers in other processes only need to
//! emit that shape to inject events.

use thiserror::Error;

use crate::domain::Event;

#[derive(Debug, Error)]
#[error("event encode failed: {0}")]
pub struct EncodeError(#[from] serde_json::Error);

#[derive(Debug, Error)]
pub enum DecodeError {
    /// Blank payloads are a producer bug, reported distinctly from broken
    /// JSON.
    #[error("empty payload")]
    Empty,
    #[error("malformed event: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Serialize an event for the queue.
pub fn encode(event: &Event) -> Result<String, EncodeError> {
    Ok(serde_json::to_string(event)?)
}

/// Parse a queue payload back into an event.
pub fn decode(raw: &str) -> Result<Event, DecodeError> {
    if raw.trim().is_empty() {
        return Err(DecodeError::Empty);
    }
    Ok(serde_json::from_str(raw)?)
}
