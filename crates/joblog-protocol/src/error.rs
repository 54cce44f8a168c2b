//! Decode errors for events responses.

/// Failure to decode an events response body.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Field {field} has unexpected type (expected {expected})")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
}
