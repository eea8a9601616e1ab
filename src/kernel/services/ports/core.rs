//! Contract of the persistence/sync core.
//!
//! The core owns the local file cache, the remote store and the merge logic.
//! Every call is synchronous and may block for an arbitrary amount of time, so
//! callers must keep them off the dispatcher thread.

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(Uuid);

impl FileId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for FileId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FileKind {
    Document,
    Folder,
    Link { target: FileId },
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Document => f.write_str("Document"),
            FileKind::Folder => f.write_str("Folder"),
            FileKind::Link { target } => write!(f, "Link('{}')", target),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub id: FileId,
    pub parent: FileId,
    pub name: CompactString,
    pub kind: FileKind,
    pub lastmod: DateTime<Utc>,
}

impl File {
    pub fn is_folder(&self) -> bool {
        matches!(self.kind, FileKind::Folder)
    }

    /// The root is the only file that is its own parent.
    pub fn is_root(&self) -> bool {
        self.id == self.parent
    }
}

/// Folders first, then by name. Stable, so equal names keep core order.
pub fn sort_files(files: &mut [File]) {
    files.sort_by(|a, b| {
        b.is_folder()
            .cmp(&a.is_folder())
            .then_with(|| a.name.cmp(&b.name))
    });
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub id: FileId,
    pub name: CompactString,
}

/// Result of listing one folder for the explorer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirListing {
    pub id: FileId,
    pub parents: Vec<Breadcrumb>,
    pub files: Vec<File>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncWorkUnit {
    PullMetadata,
    PushMetadata,
    PullDocument(FileId),
    PushDocument(FileId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncProgress {
    pub total: u64,
    pub progress: u64,
    pub current: SyncWorkUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreErrorCode {
    Unexpected,
    FileNotFound,
    FileNotDocument,
    FileNotFolder,
    FileNameConflict,
    CouldNotReachServer,
    Io,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CoreError {
    pub code: CoreErrorCode,
    pub message: String,
}

impl CoreError {
    pub fn new(code: CoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(CoreErrorCode::Unexpected, message)
    }

    pub fn not_found(id: FileId) -> Self {
        Self::new(CoreErrorCode::FileNotFound, format!("file {} not found", id))
    }
}

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        Self::new(CoreErrorCode::Io, e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(CoreErrorCode::Unexpected, e.to_string())
    }
}

pub trait NoteCore: Send + Sync {
    fn write_document(&self, id: FileId, content: &[u8]) -> Result<()>;

    fn read_document(&self, id: FileId) -> Result<Vec<u8>>;

    /// Pushes local changes and pulls remote ones, reporting each work unit.
    fn sync_all(&self, progress: &mut dyn FnMut(SyncProgress)) -> Result<()>;

    fn last_synced_human_string(&self) -> Result<String>;

    fn root(&self) -> Result<File>;

    fn file_by_id(&self, id: FileId) -> Result<File>;

    fn children(&self, id: FileId) -> Result<Vec<File>>;

    fn create_file(&self, name: &str, parent: FileId, kind: FileKind) -> Result<File>;
}

/// Ancestors of `id` (itself included, root excluded), ordered from the root down.
pub fn parents_of(core: &dyn NoteCore, id: FileId) -> Result<Vec<Breadcrumb>> {
    let mut parents = Vec::new();
    let mut id = id;
    loop {
        let file = core.file_by_id(id)?;
        if file.is_root() {
            break;
        }
        parents.push(Breadcrumb {
            id: file.id,
            name: file.name.clone(),
        });
        id = file.parent;
    }
    parents.reverse();
    Ok(parents)
}

/// Lists `target` (the root when `None`) with its breadcrumbs, folders first.
pub fn list_dir(core: &dyn NoteCore, target: Option<FileId>) -> Result<DirListing> {
    let id = match target {
        Some(id) => id,
        None => core.root()?.id,
    };
    let parents = parents_of(core, id)?;
    let mut files = core.children(id)?;
    sort_files(&mut files);
    Ok(DirListing { id, parents, files })
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/ports/core.rs"]
mod tests;
