use serde::{Deserialize, Serialize};

/// API error payload
#[derive(Serialize)]
pub struct ApiError {
    pub message: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Acknowledgement for container actions: the sequence of the snapshot
/// that reflects the change.
#[derive(Serialize)]
pub struct SequenceResponse {
    pub sequence: u64,
}

/// Query string for the container log endpoint.
#[derive(Deserialize)]
pub struct LogsQuery {
    pub tail: Option<usize>,
}
