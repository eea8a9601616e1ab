//! Service ports: traits + data contracts.

pub mod config;
pub mod core;
pub mod settings;

pub use self::core::{
    list_dir, parents_of, sort_files, Breadcrumb, CoreError, CoreErrorCode, DirListing, File,
    FileId, FileKind, NoteCore, Result as CoreResult, SyncProgress, SyncWorkUnit,
};
pub use config::WorkspaceConfig;
pub use settings::Settings;
