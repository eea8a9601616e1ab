use super::config::WorkspaceConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_autosave_interval_ms")]
    pub autosave_interval_ms: u64,
    #[serde(default = "default_autosync_interval_ms")]
    pub autosync_interval_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}

fn default_autosave_interval_ms() -> u64 {
    3_000
}

fn default_autosync_interval_ms() -> u64 {
    5_000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            autosave_interval_ms: default_autosave_interval_ms(),
            autosync_interval_ms: default_autosync_interval_ms(),
            data_dir: None,
            log_filter: None,
        }
    }
}

impl Settings {
    /// Zero intervals would spin the timers, so they fall back to one millisecond.
    pub fn workspace_config(&self) -> WorkspaceConfig {
        WorkspaceConfig::with_intervals(
            Duration::from_millis(self.autosave_interval_ms.max(1)),
            Duration::from_millis(self.autosync_interval_ms.max(1)),
        )
    }
}
