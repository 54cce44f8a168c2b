//! Opaque fetch position issued by the server.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-issued fetch position.
///
/// The server currently emits integers, but the value is treated as opaque:
/// it is echoed back verbatim as the `token` query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawCursor", into = "RawCursor")]
pub struct Cursor(String);

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawCursor {
    Number(u64),
    Text(String),
}

impl From<RawCursor> for Cursor {
    fn from(raw: RawCursor) -> Self {
        match raw {
            RawCursor::Number(n) => Cursor(n.to_string()),
            RawCursor::Text(s) => Cursor(s),
        }
    }
}

impl From<Cursor> for RawCursor {
    fn from(cursor: Cursor) -> Self {
        match cursor.0.parse::<u64>() {
            Ok(n) => RawCursor::Number(n),
            Err(_) => RawCursor::Text(cursor.0),
        }
    }
}

impl Cursor {
    /// Cursor used for the very first request of a job.
    pub fn initial() -> Self {
        Cursor("0".to_string())
    }

    /// Wrap a raw token value.
    pub fn new(token: impl Into<String>) -> Self {
        Cursor(token.into())
    }

    /// The value sent as the `token` query parameter.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::initial()
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
