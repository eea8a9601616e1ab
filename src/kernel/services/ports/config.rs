use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkspaceConfig {
    pub autosave_interval: Duration,
    pub autosync_interval: Duration,
    pub save_queue_capacity: usize,
    pub max_drain_per_tick: usize,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            autosave_interval: Duration::from_secs(3),
            autosync_interval: Duration::from_secs(5),
            save_queue_capacity: 8,
            max_drain_per_tick: 256,
        }
    }
}

impl WorkspaceConfig {
    pub fn with_intervals(autosave_interval: Duration, autosync_interval: Duration) -> Self {
        Self {
            autosave_interval,
            autosync_interval,
            ..Self::default()
        }
    }
}
