use std::{path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::categorizer::rules::RuleSet;

pub const CONFIG_FILE_NAME: &str = "config.json";

/// Tracker settings. Every field is optional in the JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub sampling_interval_secs: u64,
    /// Sessions shorter than this are never recorded.
    pub min_session_secs: u64,
    /// Size of the broadcast channel feeding event subscribers.
    pub event_capacity: usize,
    /// Closed records older than this many days before the newest record are dropped.
    pub history_days: u32,
    pub rules: RuleSet,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            sampling_interval_secs: 1,
            min_session_secs: 1,
            event_capacity: 256,
            history_days: 7,
            rules: RuleSet::default(),
        }
    }
}

impl TrackerConfig {
    pub fn sampling_interval(&self) -> Duration {
        Duration::from_secs(self.sampling_interval_secs.max(1))
    }

    pub fn min_session(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.min_session_secs.min(i64::MAX as u64) as i64)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {path:?}"))?;
        let config = serde_json::from_str::<TrackerConfig>(&content)
            .with_context(|| format!("Failed to parse config {path:?}"))?;
        info!("Loaded config from {path:?}");
        Ok(config)
    }

    /// An explicitly passed file must exist. Otherwise `config.json` in the application directory
    /// is used when present, falling back to defaults.
    pub fn load(explicit: Option<&Path>, app_dir: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match app_dir.map(|dir| dir.join(CONFIG_FILE_NAME)) {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }
}
