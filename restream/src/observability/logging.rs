//! Global `tracing` subscriber setup.

use crate::errors::{RestreamError, Result};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Logging configuration for binaries and test harnesses embedding restream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, e.g. `"restream=debug"`.
    pub filter: String,
    /// Emit JSON lines instead of human readable text.
    pub json: bool,
    /// Include the event target in each line.
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "restream=info".to_string(),
            json: false,
            with_target: true,
        }
    }
}

impl LoggingConfig {
    /// Creates a text logging config with the given filter directives.
    #[must_use]
    pub fn new(filter: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            ..Self::default()
        }
    }

    /// Switches output to JSON lines.
    #[must_use]
    pub const fn json(mut self) -> Self {
        self.json = true;
        self
    }

    /// Parses the filter directives.
    pub fn env_filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_new(&self.filter).map_err(|e| {
            RestreamError::invalid_config(format!("invalid log filter '{}': {e}", self.filter))
        })
    }
}

/// Installs a global subscriber for `config`.
///
/// # Errors
///
/// Returns [`RestreamError::InvalidConfig`] for unparsable filter
/// directives and [`RestreamError::Internal`] if a global subscriber is
/// already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = config.env_filter()?;
    let json_layer = config
        .json
        .then(|| fmt::layer().json().with_target(config.with_target));
    let text_layer = (!config.json).then(|| fmt::layer().with_target(config.with_target));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| RestreamError::Internal(format!("failed to install subscriber: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.filter, "restream=info");
        assert!(!config.json);
        assert!(config.env_filter().is_ok());
    }

    #[test]
    fn test_config_from_json() {
        let config: LoggingConfig = serde_json::from_str(r#"{"json": true}"#).unwrap();
        assert!(config.json);
        assert_eq!(config.filter, "restream=info");
    }

    #[test]
    fn test_invalid_filter_is_rejected() {
        let err = init_tracing(&LoggingConfig::new("restream=notalevel")).unwrap_err();
        assert!(matches!(err, RestreamError::InvalidConfig(_)));
    }

    #[test]
    fn test_second_init_fails() {
        let config = LoggingConfig::new("restream=debug").json();
        let _ = init_tracing(&config);
        let err = init_tracing(&config).unwrap_err();
        assert!(matches!(err, RestreamError::Internal(_)));
    }
}
