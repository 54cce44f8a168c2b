//! Log event types.
//!
//! Events are discriminated by the string `event` field. Tags this crate does
//! not know about decode to [`Event::Unknown`] so that newer servers can add
//! event kinds without breaking older consumers.

use serde::{Deserialize, Deserializer, Serialize};

/// Server clock timestamp, unix seconds.
pub type Timestamp = i64;

/// A single log event as served by the events endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum Event {
    /// A shell directive started executing.
    #[serde(rename = "cmd_started")]
    CommandStarted {
        directive: String,
        #[serde(deserialize_with = "lenient_timestamp")]
        timestamp: Timestamp,
    },

    /// A chunk of output from the running directive. May hold several lines,
    /// a partial line, or carriage returns.
    #[serde(rename = "cmd_output")]
    CommandOutput {
        output: String,
        #[serde(deserialize_with = "lenient_timestamp")]
        timestamp: Timestamp,
    },

    /// The running directive exited.
    #[serde(rename = "cmd_finished")]
    CommandFinished {
        exit_code: i32,
        #[serde(deserialize_with = "lenient_timestamp")]
        timestamp: Timestamp,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        directive: Option<String>,
        #[serde(
            default,
            deserialize_with = "lenient_optional_timestamp",
            skip_serializing_if = "Option::is_none"
        )]
        started_at: Option<Timestamp>,
        #[serde(
            default,
            deserialize_with = "lenient_optional_timestamp",
            skip_serializing_if = "Option::is_none"
        )]
        finished_at: Option<Timestamp>,
    },

    /// The job as a whole ended.
    #[serde(rename = "job_finished")]
    JobFinished {
        result: JobResult,
        #[serde(deserialize_with = "lenient_timestamp")]
        timestamp: Timestamp,
    },

    /// Any event kind this consumer does not understand.
    #[serde(other)]
    Unknown,
}

/// Final job result reported by `job_finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobResult {
    Passed,
    Failed,
    Stopped,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl Event {
    /// Build a `cmd_started` event.
    pub fn started(directive: impl Into<String>, timestamp: Timestamp) -> Self {
        Event::CommandStarted {
            directive: directive.into(),
            timestamp,
        }
    }

    /// Build a `cmd_output` event.
    pub fn output(output: impl Into<String>, timestamp: Timestamp) -> Self {
        Event::CommandOutput {
            output: output.into(),
            timestamp,
        }
    }

    /// Build a `cmd_finished` event.
    pub fn finished(exit_code: i32, timestamp: Timestamp) -> Self {
        Event::CommandFinished {
            exit_code,
            timestamp,
            directive: None,
            started_at: None,
            finished_at: None,
        }
    }

    /// Build a `job_finished` event.
    pub fn job_finished(result: JobResult, timestamp: Timestamp) -> Self {
        Event::JobFinished { result, timestamp }
    }

    /// Decode one event from its JSON form.
    ///
    /// Never fails. Unknown tags become `Unknown` silently; a known tag with
    /// missing or mistyped fields also becomes `Unknown`, with a warning.
    pub fn decode(value: serde_json::Value) -> Self {
        let tag = value
            .get("event")
            .and_then(|t| t.as_str())
            .map(str::to_owned);

        match serde_json::from_value::<Event>(value) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(event = ?tag, error = %e, "ignoring malformed log event");
                Event::Unknown
            }
        }
    }

    /// Wire tag of this event, if it is a known kind.
    pub fn kind(&self) -> Option<&'static str> {
        match self {
            Event::CommandStarted { .. } => Some(crate::names::CMD_STARTED),
            Event::CommandOutput { .. } => Some(crate::names::CMD_OUTPUT),
            Event::CommandFinished { .. } => Some(crate::names::CMD_FINISHED),
            Event::JobFinished { .. } => Some(crate::names::JOB_FINISHED),
            Event::Unknown => None,
        }
    }
}

/// Accepts integers, floats (truncated) and numeric strings.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Timestamp, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    timestamp_from_value(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", value)))
}

fn lenient_optional_timestamp<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    timestamp_from_value(&value)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", value)))
}

fn timestamp_from_value(value: &serde_json::Value) -> Option<Timestamp> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_known_kinds() {
        let started = Event::decode(json!({"event": "cmd_started", "directive": "make test", "timestamp": 10}));
        assert_eq!(started, Event::started("make test", 10));

        let output = Event::decode(json!({"event": "cmd_output", "output": "ok\n", "timestamp": 11}));
        assert_eq!(output, Event::output("ok\n", 11));

        let finished = Event::decode(json!({"event": "cmd_finished", "exit_code": 2, "timestamp": 12}));
        assert_eq!(finished, Event::finished(2, 12));

        let job = Event::decode(json!({"event": "job_finished", "result": "failed", "timestamp": 13}));
        assert_eq!(job, Event::job_finished(JobResult::Failed, 13));
    }

    #[test]
    fn test_unknown_tag_decodes_to_unknown() {
        let event = Event::decode(json!({"event": "job_teardown_started", "timestamp": 1}));
        assert_eq!(event, Event::Unknown);
        assert!(event.kind().is_none());
    }

    #[test]
    fn test_missing_tag_decodes_to_unknown() {
        assert_eq!(Event::decode(json!({"timestamp": 1})), Event::Unknown);
        assert_eq!(Event::decode(json!("not an object")), Event::Unknown);
    }

    #[test]
    fn test_known_tag_with_bad_fields_decodes_to_unknown() {
        let event = Event::decode(json!({"event": "cmd_finished", "exit_code": "zero", "timestamp": 1}));
        assert_eq!(event, Event::Unknown);
    }

    #[test]
    fn test_lenient_timestamps() {
        let event = Event::decode(json!({
            "event": "cmd_finished",
            "exit_code": 0,
            "timestamp": 123456.7,
            "directive": "make test",
            "started_at": "654321",
            "finished_at": 383838
        }));

        match event {
            Event::CommandFinished { timestamp, started_at, finished_at, directive, .. } => {
                assert_eq!(timestamp, 123456);
                assert_eq!(started_at, Some(654321));
                assert_eq!(finished_at, Some(383838));
                assert_eq!(directive.as_deref(), Some("make test"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_unknown_job_result() {
        let event = Event::decode(json!({"event": "job_finished", "result": "exploded", "timestamp": 1}));
        assert_eq!(event, Event::job_finished(JobResult::Unknown, 1));
    }

    #[test]
    fn test_serialize_uses_wire_tags() {
        let value = serde_json::to_value(Event::output("x", 5)).unwrap();
        assert_eq!(value, json!({"event": "cmd_output", "output": "x", "timestamp": 5}));
    }
}
