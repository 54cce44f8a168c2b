//! Built-in defaults (layer 1)

use serde::{Deserialize, Serialize};

/// Built-in default values for every tunable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Consecutive fetch errors tolerated (default: 7)
    pub max_consecutive_errors: u32,

    /// Delay after an empty page or an error (default: 5000 ms)
    pub back_off_interval_ms: u64,

    /// Delay after a page with events (default: 200 ms)
    pub regular_interval_ms: u64,

    /// Per-request HTTP timeout (default: 30 s)
    pub request_timeout_seconds: u64,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            max_consecutive_errors: 7,
            back_off_interval_ms: 5000,
            regular_interval_ms: 200,
            request_timeout_seconds: 30,
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "fetch": {
                "max_consecutive_errors": self.max_consecutive_errors,
                "back_off_interval_ms": self.back_off_interval_ms,
                "regular_interval_ms": self.regular_interval_ms,
                "request_timeout_seconds": self.request_timeout_seconds
            },
            "render": {}
        })
    }
}
