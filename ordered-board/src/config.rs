//! Board configuration loaded with figment.
//!
//! Sources, later overriding earlier:
//! 1. Defaults ([`BoardConfig::default`])
//! 2. An optional YAML file
//! 3. Environment variables prefixed `BOARD_` (e.g. `BOARD_SYNC_TIMEOUT_MS=5000`)

use crate::error::Result;
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Environment variable prefix for board settings
pub const ENV_PREFIX: &str = "BOARD_";

/// A priority tier: items with a value at or above `min` (and below the
/// next tier) belong to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketSpec {
    pub name: String,
    pub min: f64,
}

/// Settings for one board session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// How long a persist call may take before it counts as rejected
    pub sync_timeout_ms: u64,
    /// Buffered change notifications per subscriber
    pub event_capacity: usize,
    /// Attribute summed for story points
    pub story_points_attribute: String,
    /// Attribute read for priority buckets
    pub priority_attribute: String,
    /// Partition whose points are compared against `planned_capacity`
    pub capacity_partition: Option<String>,
    pub planned_capacity: Option<f64>,
    /// Partition the priority buckets count; every partition when unset
    pub priority_partition: Option<String>,
    pub priority_buckets: Vec<BucketSpec>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            sync_timeout_ms: 10_000,
            event_capacity: 64,
            story_points_attribute: "storyPoints".into(),
            priority_attribute: "priority".into(),
            capacity_partition: Some("sprint".into()),
            planned_capacity: None,
            priority_partition: None,
            priority_buckets: vec![
                BucketSpec {
                    name: "high".into(),
                    min: 60.0,
                },
                BucketSpec {
                    name: "medium".into(),
                    min: 30.0,
                },
                BucketSpec {
                    name: "low".into(),
                    min: 0.0,
                },
            ],
        }
    }
}

impl BoardConfig {
    /// Load from defaults, an optional YAML file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: BoardConfig = Self::figment(path).extract()?;
        debug!(
            sync_timeout_ms = config.sync_timeout_ms,
            planned_capacity = ?config.planned_capacity,
            "loaded board configuration"
        );
        Ok(config)
    }

    /// The figment behind [`load`](Self::load), for hosts that want to merge
    /// in sources of their own
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(BoardConfig::default()));
        if let Some(path) = path {
            debug!(path = %path.display(), "merging board config file");
            figment = figment.merge(Yaml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Persist timeout as a duration
    pub fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_timeout_ms)
    }

    /// Set the planned capacity
    pub fn with_planned_capacity(mut self, planned: f64) -> Self {
        self.planned_capacity = Some(planned);
        self
    }

    /// Set the persist timeout
    pub fn with_sync_timeout(mut self, timeout: Duration) -> Self {
        self.sync_timeout_ms = timeout.as_millis() as u64;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    #[serial]
    fn test_defaults() {
        let config = BoardConfig::load(None).unwrap();
        assert_eq!(config, BoardConfig::default());
        assert_eq!(config.sync_timeout(), Duration::from_secs(10));
    }

    #[test]
    #[serial]
    fn test_yaml_file_overrides_defaults() {
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        writeln!(
            file,
            "sync_timeout_ms: 2500\nplanned_capacity: 20\npriority_partition: sprint"
        )
        .unwrap();

        let config = BoardConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.sync_timeout_ms, 2500);
        assert_eq!(config.planned_capacity, Some(20.0));
        assert_eq!(config.priority_partition.as_deref(), Some("sprint"));
        assert_eq!(config.story_points_attribute, "storyPoints");
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        writeln!(file, "sync_timeout_ms: 2500").unwrap();

        std::env::set_var("BOARD_SYNC_TIMEOUT_MS", "750");
        let config = BoardConfig::load(Some(file.path()));
        std::env::remove_var("BOARD_SYNC_TIMEOUT_MS");

        assert_eq!(config.unwrap().sync_timeout_ms, 750);
    }

    #[test]
    #[serial]
    fn test_invalid_value_is_config_error() {
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        writeln!(file, "sync_timeout_ms: soon").unwrap();

        let result = BoardConfig::load(Some(file.path()));
        assert!(matches!(result, Err(crate::BoardError::Config(_))));
    }
}
