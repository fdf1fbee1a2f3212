//! Configuration for retry operators.

use crate::errors::{RestreamError, Result};
use serde::{Deserialize, Serialize};

/// Configuration shared by every link a [`RetryOperator`](super::RetryOperator) creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Name used in logs and event payloads.
    pub label: String,
    /// Maximum retries per link; `None` retries as often as the predicate asks.
    pub max_retries: Option<u64>,
    /// Whether links report lifecycle events to the event sink.
    pub emit_events: bool,
    /// Whether demand returned by the consumer for an item is added upstream.
    ///
    /// When `false`, the link only consumes its own counter and never grows
    /// demand beyond what was requested through the connection.
    pub honor_consumer_demand: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            label: "retry".to_string(),
            max_retries: None,
            emit_events: true,
            honor_consumer_demand: true,
        }
    }
}

impl RetryConfig {
    /// Creates a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a config from JSON and validates it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Caps the number of retries per link.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u64) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Enables or disables event emission.
    #[must_use]
    pub const fn with_events(mut self, enabled: bool) -> Self {
        self.emit_events = enabled;
        self
    }

    /// Chooses whether consumer-returned demand is honored.
    #[must_use]
    pub const fn with_consumer_demand(mut self, honor: bool) -> Self {
        self.honor_consumer_demand = honor;
        self
    }

    /// Checks the config for values that cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.label.trim().is_empty() {
            return Err(RestreamError::invalid_config("label must not be empty"));
        }
        Ok(())
    }

    /// Returns true if another retry fits within the budget.
    #[must_use]
    pub fn allows_retry(&self, retries_so_far: u64) -> bool {
        self.max_retries.map_or(true, |max| retries_so_far < max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RetryConfig::default();
        assert_eq!(config.label, "retry");
        assert_eq!(config.max_retries, None);
        assert!(config.emit_events);
        assert!(config.honor_consumer_demand);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = RetryConfig::new()
            .with_label("fetch")
            .with_max_retries(2)
            .with_events(false)
            .with_consumer_demand(false);

        assert_eq!(config.label, "fetch");
        assert_eq!(config.max_retries, Some(2));
        assert!(!config.emit_events);
        assert!(!config.honor_consumer_demand);
    }

    #[test]
    fn test_retry_budget() {
        let unlimited = RetryConfig::new();
        assert!(unlimited.allows_retry(u64::MAX - 1));

        let capped = RetryConfig::new().with_max_retries(2);
        assert!(capped.allows_retry(0));
        assert!(capped.allows_retry(1));
        assert!(!capped.allows_retry(2));

        assert!(!RetryConfig::new().with_max_retries(0).allows_retry(0));
    }

    #[test]
    fn test_empty_label_rejected() {
        let err = RetryConfig::new().with_label("  ").validate().unwrap_err();
        assert!(matches!(err, RestreamError::InvalidConfig(_)));
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = RetryConfig::from_json(r#"{"label": "poll", "max_retries": 3}"#).unwrap();
        assert_eq!(config.label, "poll");
        assert_eq!(config.max_retries, Some(3));
        assert!(config.emit_events);
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        assert!(RetryConfig::from_json(r#"{"label": ""}"#).is_err());
        assert!(matches!(
            RetryConfig::from_json("not json"),
            Err(RestreamError::Serialization(_))
        ));
    }
}
