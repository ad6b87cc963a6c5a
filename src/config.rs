//! Real-time layer configuration.

use crate::error::{RealtimeError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Tunables shared by every subsystem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Queue depth per event-bus subscriber.
    /// Default: 1000
    pub bus_buffer_size: usize,

    /// Recently inserted record ids remembered per subsystem to drop
    /// redelivered inserts. 0 disables deduplication.
    /// Default: 512
    pub dedup_window: usize,

    /// Prefix for listener thread names.
    /// Default: "realtime"
    pub thread_name_prefix: String,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            bus_buffer_size: 1000,
            dedup_window: 512,
            thread_name_prefix: "realtime".to_string(),
        }
    }
}

impl RealtimeConfig {
    /// Parse from JSON; missing keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| RealtimeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    pub fn with_dedup_window(mut self, dedup_window: usize) -> Self {
        self.dedup_window = dedup_window;
        self
    }

    /// Queues hold at least one event; 0 is raised to 1.
    pub fn with_bus_buffer_size(mut self, bus_buffer_size: usize) -> Self {
        self.bus_buffer_size = bus_buffer_size.max(1);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.bus_buffer_size == 0 {
            return Err(RealtimeError::Config(
                "bus_buffer_size must be at least 1".to_string(),
            ));
        }
        if self.thread_name_prefix.is_empty() {
            return Err(RealtimeError::Config(
                "thread_name_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = RealtimeConfig::from_json_str(r#"{"dedup_window": 0}"#).unwrap();
        assert_eq!(config.dedup_window, 0);
        assert_eq!(config.bus_buffer_size, 1000);
        assert_eq!(config.thread_name_prefix, "realtime");
    }

    #[test]
    fn test_rejects_zero_bus_buffer() {
        let result = RealtimeConfig::from_json_str(r#"{"bus_buffer_size": 0}"#);
        assert!(matches!(result, Err(RealtimeError::Config(_))));
    }

    #[test]
    fn test_builder_keeps_bus_buffer_usable() {
        let config = RealtimeConfig::default().with_bus_buffer_size(0);
        assert_eq!(config.bus_buffer_size, 1);
        assert_eq!(RealtimeConfig::default().with_bus_buffer_size(64).bus_buffer_size, 64);
    }

    #[test]
    fn test_rejects_malformed_json() {
        let result = RealtimeConfig::from_json_str("{dedup_window:");
        assert!(matches!(result, Err(RealtimeError::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"thread_name_prefix": "live", "bus_buffer_size": 64}}"#).unwrap();

        let config = RealtimeConfig::load(file.path()).unwrap();
        assert_eq!(config.thread_name_prefix, "live");
        assert_eq!(config.bus_buffer_size, 64);
        assert_eq!(config.dedup_window, 512);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = RealtimeConfig::load(dir.path().join("absent.json"));
        assert!(matches!(result, Err(RealtimeError::Config(_))));
    }
}
