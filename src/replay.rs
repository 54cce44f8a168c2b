//! Replay of recorded event streams
//!
//! Accepts the formats events are stored and served in:
//! - an events page: `{"events": [...], "next": ...}`
//! - a bare JSON array of events
//! - newline-delimited JSON, one event per line

use joblog_protocol::{DecodeError, Event, EventsPage};

use crate::queue::EventQueue;
use crate::render::{RenderConfig, RenderLoop, RenderReport, View};

/// Decode a recording into events, in file order.
pub fn parse_recording(contents: &str) -> Result<Vec<Event>, DecodeError> {
    let trimmed = contents.trim_start();

    if trimmed.starts_with('[') {
        let values: Vec<serde_json::Value> = serde_json::from_str(trimmed)?;
        return Ok(values.into_iter().map(Event::decode).collect());
    }

    if trimmed.starts_with('{') {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
            if value.get("events").is_some() {
                return Ok(EventsPage::from_value(value)?.events);
            }
        }
    }

    let mut events = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: serde_json::Value = serde_json::from_str(line)?;
        events.push(Event::decode(value));
    }
    Ok(events)
}

/// Fold a finished recording through the render loop.
pub async fn replay<V: View>(events: Vec<Event>, view: V, config: RenderConfig) -> RenderReport<V> {
    let queue = EventQueue::new();
    queue.push_all(events);
    queue.stop();

    RenderLoop::new(queue, view, config).run().await
}
