use compact_str::CompactString;
use ropey::Rope;
use std::time::Instant;

use super::effect::SaveRequest;
use super::message::TextEdit;
use crate::kernel::services::ports::{Breadcrumb, CoreError, DirListing, File, FileId};

#[derive(Debug, Clone)]
pub struct DocumentTab {
    pub id: FileId,
    pub name: CompactString,
    pub buffer: Rope,
    pub loading: bool,
    pub last_edit_at: Option<Instant>,
    pub last_save_at: Option<Instant>,
    pub pending_save_count: u32,
}

impl DocumentTab {
    pub fn new(id: FileId, name: CompactString) -> Self {
        Self {
            id,
            name,
            buffer: Rope::new(),
            loading: true,
            last_edit_at: None,
            last_save_at: None,
            pending_save_count: 0,
        }
    }

    /// `last_save_at < last_edit_at`, with an unset timestamp ordered before every instant.
    pub fn is_dirty(&self) -> bool {
        match (self.last_save_at, self.last_edit_at) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(saved), Some(edited)) => saved < edited,
        }
    }

    pub fn is_saving(&self) -> bool {
        self.pending_save_count > 0
    }

    pub fn snapshot(&self) -> SaveRequest {
        SaveRequest::new(self.id, self.buffer.clone())
    }

    pub fn set_content(&mut self, bytes: &[u8]) {
        self.buffer = Rope::from_str(&String::from_utf8_lossy(bytes));
        self.loading = false;
    }

    /// Applies `edit` with offsets clamped to the buffer. Returns whether the text changed.
    pub fn apply_edit(&mut self, edit: &TextEdit) -> bool {
        let len = self.buffer.len_chars();
        match edit {
            TextEdit::Insert { at, text } => {
                if text.is_empty() {
                    return false;
                }
                self.buffer.insert((*at).min(len), text);
                true
            }
            TextEdit::Delete { range } => {
                let start = range.start.min(len);
                let end = range.end.min(len);
                if start >= end {
                    return false;
                }
                self.buffer.remove(start..end);
                true
            }
            TextEdit::ReplaceAll(text) => {
                if self.buffer == text.as_str() {
                    return false;
                }
                self.buffer = Rope::from_str(text);
                true
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackgroundError {
    #[error("saving {id}: {source}")]
    Save { id: FileId, source: CoreError },
    #[error("syncing: {0}")]
    Sync(CoreError),
    #[error("getting last synced: {0}")]
    Status(CoreError),
}

#[derive(Debug, Clone, Default)]
pub struct ExplorerState {
    /// `None` means the root folder.
    pub target: Option<FileId>,
    pub current: Option<FileId>,
    pub parents: Vec<Breadcrumb>,
    pub entries: Vec<File>,
}

impl ExplorerState {
    pub fn populate(&mut self, listing: DirListing) {
        self.current = Some(listing.id);
        self.parents = listing.parents;
        self.entries = listing.files;
    }
}

#[derive(Debug, Clone)]
pub struct WorkspaceState {
    pub tabs: Vec<DocumentTab>,
    pub active_tab: usize,
    pub explorer: ExplorerState,
    pub bg_errors: Vec<BackgroundError>,
    pub status: String,
    pub last_action_at: Instant,
    pub last_edit_at: Option<Instant>,
    pub closing: bool,
}

impl WorkspaceState {
    pub fn new(now: Instant) -> Self {
        Self {
            tabs: Vec::new(),
            active_tab: 0,
            explorer: ExplorerState::default(),
            bg_errors: Vec::new(),
            status: String::new(),
            last_action_at: now,
            last_edit_at: None,
            closing: false,
        }
    }

    pub fn tab(&self, id: FileId) -> Option<&DocumentTab> {
        self.tabs.iter().find(|t| t.id == id)
    }

    pub fn tab_mut(&mut self, id: FileId) -> Option<&mut DocumentTab> {
        self.tabs.iter_mut().find(|t| t.id == id)
    }

    pub fn active(&self) -> Option<&DocumentTab> {
        self.tabs.get(self.active_tab)
    }

    /// Inserts a new tab right after the active one and focuses it.
    pub fn insert_tab(&mut self, id: FileId, name: CompactString) {
        let at = if self.tabs.is_empty() {
            0
        } else {
            self.active_tab + 1
        };
        self.tabs.insert(at, DocumentTab::new(id, name));
        self.active_tab = at;
    }

    /// Out-of-range indices are ignored.
    pub fn select_tab(&mut self, index: usize) -> bool {
        if index >= self.tabs.len() {
            return false;
        }
        let changed = index != self.active_tab;
        self.active_tab = index;
        changed
    }

    pub fn select_tab_by_id(&mut self, id: FileId) -> bool {
        match self.tabs.iter().position(|t| t.id == id) {
            Some(index) => self.select_tab(index),
            None => false,
        }
    }

    pub fn close_tab(&mut self, id: FileId) -> Option<DocumentTab> {
        let index = self.tabs.iter().position(|t| t.id == id)?;
        let tab = self.tabs.remove(index);
        if self.active_tab > index || (self.active_tab >= self.tabs.len() && self.active_tab != 0) {
            self.active_tab -= 1;
        }
        Some(tab)
    }

    pub fn dirty_tabs(&self) -> impl Iterator<Item = &DocumentTab> {
        self.tabs.iter().filter(|t| !t.loading && t.is_dirty())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/state.rs"]
mod tests;
