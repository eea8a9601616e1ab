//! Service adapters: OS/runtime specific implementations (IO/async).

pub mod local_core;
pub mod paths;
pub mod runtime;
pub mod settings;

pub use local_core::LocalCore;
pub use paths::{ensure_data_dir, ensure_log_dir, get_cache_dir, get_data_dir, get_log_dir};
pub use runtime::{sync_once, BlockingQueue, SaveQueue, TimerHandle, WorkspaceRuntime};
pub use settings::{ensure_settings_file, get_settings_path, load_settings, SettingsError};
