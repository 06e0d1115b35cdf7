use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request identifier (UUID v4), also attached to the run's log span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataMode {
    Live,
    Mock,
}

/// Envelope metadata printed alongside every command's data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub request_id: RequestId,
    pub command: String,
    pub mode: DataMode,
    pub latency_ms: u64,
}

impl Metadata {
    pub fn new(request_id: RequestId, command: &str, mock: bool, latency_ms: u64) -> Self {
        Self {
            request_id,
            command: command.to_owned(),
            mode: if mock { DataMode::Mock } else { DataMode::Live },
            latency_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_are_unique_hyphenated_uuids() {
        let first = RequestId::new_v4();
        let second = RequestId::new_v4();
        assert_ne!(first, second);
        assert_eq!(first.to_string().len(), 36);
    }

    #[test]
    fn metadata_serializes_mode_in_snake_case() {
        let metadata = Metadata::new(RequestId::new_v4(), "chart", true, 12);
        let value = serde_json::to_value(&metadata).expect("serializable");
        assert_eq!(value["mode"], "mock");
        assert_eq!(value["command"], "chart");
        assert_eq!(value["latency_ms"], 12);
    }
}
