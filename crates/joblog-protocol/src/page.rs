//! Events endpoint response body.

use serde::{Deserialize, Deserializer, Serialize};

use crate::cursor::Cursor;
use crate::error::DecodeError;
use crate::event::Event;

/// One page of events plus the cursor for the next request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventsPage {
    /// Events in server order.
    #[serde(default, deserialize_with = "decode_events")]
    pub events: Vec<Event>,

    /// Cursor for the next request. `None` means the stream has ended and no
    /// further events will ever be served.
    #[serde(default)]
    pub next: Option<Cursor>,
}

impl EventsPage {
    /// Page that carries events and continues at `next`.
    pub fn new(events: Vec<Event>, next: Option<Cursor>) -> Self {
        Self { events, next }
    }

    /// Decode a response body.
    pub fn from_slice(body: &[u8]) -> Result<Self, DecodeError> {
        let value: serde_json::Value = serde_json::from_slice(body)?;
        Self::from_value(value)
    }

    /// Decode an already-parsed response body.
    pub fn from_value(value: serde_json::Value) -> Result<Self, DecodeError> {
        if !value.is_object() {
            return Err(DecodeError::WrongType {
                field: "<body>",
                expected: "object",
            });
        }
        if let Some(events) = value.get("events") {
            if !events.is_array() && !events.is_null() {
                return Err(DecodeError::WrongType {
                    field: "events",
                    expected: "array",
                });
            }
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Whether this is the final page of the stream.
    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }
}

fn decode_events<'de, D>(deserializer: D) -> Result<Vec<Event>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<serde_json::Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(Event::decode)
        .collect())
}
