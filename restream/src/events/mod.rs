//! Lifecycle events for observability.
//!
//! Retry links report what they do (retries, recoveries, terminal states)
//! to an [`EventSink`]. Payloads are JSON objects that always carry the
//! link id, the operator label and an ISO timestamp.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use crate::utils::iso_timestamp;
use serde_json::{Map, Value};
use uuid::Uuid;

/// A retry was triggered by the predicate.
pub const RETRY_TRIGGERED: &str = "retry.triggered";
/// The recovery producer is being attached.
pub const RECOVERY_STARTED: &str = "retry.recovery_started";
/// The recovery producer finished; the original producer is re-attached.
pub const RECOVERY_FINISHED: &str = "retry.recovery_finished";
/// The recovery producer failed; the failure went downstream.
pub const RECOVERY_FAILED: &str = "retry.recovery_failed";
/// The original producer finished and the consumer was told.
pub const LINK_COMPLETED: &str = "link.completed";
/// The original producer failed and the consumer was told.
pub const LINK_FAILED: &str = "link.failed";
/// The consumer cancelled the link.
pub const LINK_CANCELLED: &str = "link.cancelled";

/// Builds a link event payload, merging `extra` fields on top of the
/// common ones.
#[must_use]
pub fn link_event_payload(link_id: Uuid, label: &str, extra: Value) -> Value {
    let mut payload = Map::new();
    payload.insert("link_id".to_string(), Value::String(link_id.to_string()));
    payload.insert("label".to_string(), Value::String(label.to_string()));
    payload.insert("timestamp".to_string(), Value::String(iso_timestamp()));
    if let Value::Object(fields) = extra {
        payload.extend(fields);
    }
    Value::Object(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_has_common_fields() {
        let id = Uuid::new_v4();
        let payload = link_event_payload(id, "fetch", serde_json::json!({"retries": 2}));

        assert_eq!(payload["link_id"], id.to_string());
        assert_eq!(payload["label"], "fetch");
        assert_eq!(payload["retries"], 2);
        assert!(payload["timestamp"].as_str().is_some_and(|ts| ts.contains('T')));
    }

    #[test]
    fn test_payload_ignores_non_object_extra() {
        let payload = link_event_payload(Uuid::new_v4(), "fetch", Value::Null);
        assert_eq!(payload.as_object().map(Map::len), Some(3));
    }
}
