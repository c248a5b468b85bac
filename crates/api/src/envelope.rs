//! Uniform response envelope.
//!
//! Every response, success or failure, carries the same shape:
//! `{ success, data? | error?, metadata: { service, timestamp,
//! processing_time_ms } }`. Domain failures ride inside a 200 envelope;
//! only coordinator-level failures (bad body, auth, routing) use non-200
//! status codes.

use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tides_domain::TidesError;

#[derive(Debug, Serialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metadata: Metadata,
}

#[derive(Debug, Serialize)]
pub struct Metadata {
    pub service: String,
    pub timestamp: String,
    pub processing_time_ms: u64,
}

impl Envelope {
    pub fn success(service: &str, started: Instant, data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            metadata: Metadata::for_service(service, started),
        }
    }

    pub fn failure(service: &str, started: Instant, err: &TidesError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(client_message(err)),
            metadata: Metadata::for_service(service, started),
        }
    }
}

impl Metadata {
    fn for_service(service: &str, started: Instant) -> Self {
        Self {
            service: service.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            processing_time_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// Error string surfaced to the caller. `Internal` never leaks its detail.
fn client_message(err: &TidesError) -> String {
    match err {
        TidesError::Internal(_) => "An internal error occurred".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn success_envelope_carries_data_and_metadata() {
        let envelope = Envelope::success("report", Instant::now(), json!({"ok": true}));
        let rendered = serde_json::to_value(&envelope).expect("serialized");
        assert_eq!(rendered["success"], true);
        assert_eq!(rendered["data"]["ok"], true);
        assert_eq!(rendered["metadata"]["service"], "report");
        assert!(rendered.get("error").is_none());
        assert!(rendered["metadata"]["processing_time_ms"].is_u64());
    }

    #[test]
    fn failure_envelope_carries_the_domain_message() {
        let err = TidesError::Validation("name must not be empty".to_string());
        let envelope = Envelope::failure("create-tide", Instant::now(), &err);
        let rendered = serde_json::to_value(&envelope).expect("serialized");
        assert_eq!(rendered["success"], false);
        assert!(rendered.get("data").is_none());
        assert!(rendered["error"]
            .as_str()
            .is_some_and(|msg| msg.contains("name must not be empty")));
    }

    #[test]
    fn internal_errors_are_not_leaked() {
        let err = TidesError::Internal("sqlite file corrupt at page 7".to_string());
        let envelope = Envelope::failure("report", Instant::now(), &err);
        let rendered = serde_json::to_value(&envelope).expect("serialized");
        assert_eq!(rendered["error"], "An internal error occurred");
    }
}
