//! Profiler configuration
//!
//! Everything is fixed at construction. The struct deserializes with serde
//! so hosts can embed it in their own configuration files; missing fields
//! take their defaults.

use serde::Deserialize;
use std::time::Duration;

use crate::classification::DEFAULT_PATH_MARKER;

pub const DEFAULT_INTERVAL_MS: u64 = 100;
pub const DEFAULT_RENDER_COMMAND: &str = "dot";
pub const DEFAULT_RENDER_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_SIGNAL_TIMEOUT_MS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProfilerConfig {
    /// Only packages whose id starts with this are tracked
    pub filter_prefix: String,
    /// Marks the source root in resolved file paths
    pub path_marker: String,
    /// Pause between sampling ticks
    pub interval_ms: u64,
    pub render_command: String,
    pub render_args: Vec<String>,
    /// Upper bound on one renderer run; the process is killed past it
    pub render_timeout_ms: u64,
    /// How long the signal sampler waits for a single thread
    pub signal_timeout_ms: u64,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            filter_prefix: String::new(),
            path_marker: DEFAULT_PATH_MARKER.to_string(),
            interval_ms: DEFAULT_INTERVAL_MS,
            render_command: DEFAULT_RENDER_COMMAND.to_string(),
            render_args: vec!["-Tsvg".to_string()],
            render_timeout_ms: DEFAULT_RENDER_TIMEOUT_MS,
            signal_timeout_ms: DEFAULT_SIGNAL_TIMEOUT_MS,
        }
    }
}

impl ProfilerConfig {
    /// Default configuration tracking packages under `filter_prefix`
    pub fn new(filter_prefix: impl Into<String>) -> Self {
        Self { filter_prefix: filter_prefix.into(), ..Self::default() }
    }

    #[must_use]
    pub fn with_path_marker(mut self, marker: impl Into<String>) -> Self {
        self.path_marker = marker.into();
        self
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval_ms = interval.as_millis() as u64;
        self
    }

    #[must_use]
    pub fn with_renderer(mut self, command: impl Into<String>, args: Vec<String>) -> Self {
        self.render_command = command.into();
        self.render_args = args;
        self
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn with_render_timeout(mut self, timeout: Duration) -> Self {
        self.render_timeout_ms = timeout.as_millis() as u64;
        self
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    #[must_use]
    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }

    #[must_use]
    pub fn signal_timeout(&self) -> Duration {
        Duration::from_millis(self.signal_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProfilerConfig::new("github.com/acme/");
        assert_eq!(config.filter_prefix, "github.com/acme/");
        assert_eq!(config.path_marker, "/src/");
        assert_eq!(config.interval(), Duration::from_millis(100));
        assert_eq!(config.render_command, "dot");
        assert_eq!(config.render_args, vec!["-Tsvg"]);
    }

    #[test]
    fn test_builders() {
        let config = ProfilerConfig::new("app/")
            .with_path_marker("/crates/")
            .with_interval(Duration::from_millis(250))
            .with_renderer("cat", vec![])
            .with_render_timeout(Duration::from_secs(2));

        assert_eq!(config.path_marker, "/crates/");
        assert_eq!(config.interval_ms, 250);
        assert_eq!(config.render_command, "cat");
        assert!(config.render_args.is_empty());
        assert_eq!(config.render_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ProfilerConfig =
            serde_json::from_str(r#"{"filter_prefix": "app/", "interval_ms": 50}"#).unwrap();
        assert_eq!(config.filter_prefix, "app/");
        assert_eq!(config.interval(), Duration::from_millis(50));
        assert_eq!(config.render_command, DEFAULT_RENDER_COMMAND);
        assert_eq!(config.signal_timeout(), Duration::from_millis(DEFAULT_SIGNAL_TIMEOUT_MS));
    }
}
