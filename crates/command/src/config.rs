//! Command history configuration.

use serde::{Deserialize, Serialize};

use crate::error::HistoryError;

/// Configuration for a [`CommandHistory`](crate::CommandHistory).
///
/// Every field has a default, so a partial document deserializes:
///
/// ```rust
/// use arbor_command::HistoryConfig;
///
/// let config: HistoryConfig = serde_json::from_str(r#"{"capacity": 50}"#).unwrap();
/// assert_eq!(config.capacity, 50);
/// assert_eq!(config.event_buffer, HistoryConfig::default().event_buffer);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of journal entries; the oldest is evicted beyond it.
    pub capacity: usize,
    /// Number of history events buffered per subscriber before it lags.
    pub event_buffer: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            event_buffer: 64,
        }
    }
}

impl HistoryConfig {
    /// Default configuration with a different capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Check that the configuration can back a history.
    pub fn validate(&self) -> Result<(), HistoryError> {
        if self.capacity == 0 {
            return Err(HistoryError::InvalidConfig(
                "capacity must be at least 1".into(),
            ));
        }
        if self.event_buffer == 0 {
            return Err(HistoryError::InvalidConfig(
                "event_buffer must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
