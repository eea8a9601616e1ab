use std::ops::Range;
use std::time::Instant;

use compact_str::CompactString;

use crate::kernel::services::ports::{CoreError, DirListing, FileId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncKind {
    Auto,
    Manual,
}

/// A change to one document buffer, in char offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextEdit {
    Insert { at: usize, text: String },
    Delete { range: Range<usize> },
    ReplaceAll(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub kind: SyncKind,
    pub new_status: Option<String>,
    pub sync_error: Option<CoreError>,
    pub status_error: Option<CoreError>,
}

/// Everything the dispatcher reacts to: UI input, timer ticks and worker results.
#[derive(Debug, Clone)]
pub enum WorkspaceMessage {
    OpenDir {
        id: Option<FileId>,
    },
    DirOpened {
        target: Option<FileId>,
        result: Result<DirListing, CoreError>,
    },
    OpenDocument {
        id: FileId,
        name: CompactString,
    },
    FileOpened {
        id: FileId,
        result: Result<Vec<u8>, CoreError>,
    },
    Edited {
        id: FileId,
        edit: TextEdit,
    },
    SaveRequested {
        id: FileId,
    },
    SelectTab {
        index: usize,
    },
    CloseTab {
        id: FileId,
    },
    UserAction,
    AutosaveScan {
        generation: u64,
    },
    QueuedSave {
        id: FileId,
    },
    CompletedSave {
        id: FileId,
        error: Option<CoreError>,
        completed_at: Instant,
    },
    /// `generation` is set when the sync timer produced the message.
    StartSync {
        kind: SyncKind,
        generation: Option<u64>,
    },
    SyncResult(SyncReport),
    Shutdown,
}

impl WorkspaceMessage {
    pub fn name(&self) -> &'static str {
        match self {
            WorkspaceMessage::OpenDir { .. } => "open_dir",
            WorkspaceMessage::DirOpened { .. } => "dir_opened",
            WorkspaceMessage::OpenDocument { .. } => "open_document",
            WorkspaceMessage::FileOpened { .. } => "file_opened",
            WorkspaceMessage::Edited { .. } => "edited",
            WorkspaceMessage::SaveRequested { .. } => "save_requested",
            WorkspaceMessage::SelectTab { .. } => "select_tab",
            WorkspaceMessage::CloseTab { .. } => "close_tab",
            WorkspaceMessage::UserAction => "user_action",
            WorkspaceMessage::AutosaveScan { .. } => "autosave_scan",
            WorkspaceMessage::QueuedSave { .. } => "queued_save",
            WorkspaceMessage::CompletedSave { .. } => "completed_save",
            WorkspaceMessage::StartSync { .. } => "start_sync",
            WorkspaceMessage::SyncResult(_) => "sync_result",
            WorkspaceMessage::Shutdown => "shutdown",
        }
    }
}
