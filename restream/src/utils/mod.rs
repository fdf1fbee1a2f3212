//! Small helpers for identifiers and timestamps.

use chrono::Utc;
use uuid::Uuid;

/// Generates a new UUID v4, used to identify retry links.
#[must_use]
pub fn generate_uuid() -> Uuid {
    Uuid::new_v4()
}

/// Returns the current UTC time as an ISO 8601 string with microseconds,
/// e.g. `2024-05-01T12:00:00.123456+00:00`.
#[must_use]
pub fn iso_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}
