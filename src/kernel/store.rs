//! The update dispatcher: the only place workspace state changes.

use std::time::Instant;

use super::scheduler::{AutosaveScheduler, ScanDecision, SyncScheduler};
use super::{
    BackgroundError, Effect, SyncKind, SyncReport, TextEdit, WorkspaceMessage, WorkspaceState,
};
use crate::kernel::services::ports::{CoreError, DirListing, FileId, WorkspaceConfig};

pub struct DispatchResult {
    pub effects: Vec<Effect>,
    pub state_changed: bool,
}

impl DispatchResult {
    fn unchanged() -> Self {
        Self {
            effects: Vec::new(),
            state_changed: false,
        }
    }

    fn changed(effects: Vec<Effect>) -> Self {
        Self {
            effects,
            state_changed: true,
        }
    }
}

pub struct Store {
    state: WorkspaceState,
    autosave: AutosaveScheduler,
    sync: SyncScheduler,
}

impl Store {
    pub fn new(config: &WorkspaceConfig, now: Instant) -> Self {
        Self {
            state: WorkspaceState::new(now),
            autosave: AutosaveScheduler::new(config.autosave_interval),
            sync: SyncScheduler::new(config.autosync_interval),
        }
    }

    /// Seeds the status line from the last sync recorded by the core.
    pub fn with_last_synced(mut self, last_synced: &str) -> Self {
        if !last_synced.is_empty() {
            self.state.status = format!("Synced {}", last_synced);
        }
        self
    }

    /// Arms the sync timer and lists the root folder.
    pub fn start(&mut self, now: Instant) -> Vec<Effect> {
        vec![self.sync.start(now), Effect::ListDir { target: None }]
    }

    pub fn state(&self) -> &WorkspaceState {
        &self.state
    }

    pub fn autosave(&self) -> &AutosaveScheduler {
        &self.autosave
    }

    pub fn sync(&self) -> &SyncScheduler {
        &self.sync
    }

    pub fn is_syncing(&self) -> bool {
        self.sync.is_running()
    }

    pub fn next_sync_at(&self) -> Option<Instant> {
        self.sync.next_sync_at()
    }

    pub fn dispatch(&mut self, message: WorkspaceMessage, now: Instant) -> DispatchResult {
        match message {
            WorkspaceMessage::OpenDir { id } => {
                let mut effects = self.note_action(now);
                self.state.explorer.target = id;
                effects.push(Effect::ListDir { target: id });
                DispatchResult::changed(effects)
            }
            WorkspaceMessage::DirOpened { target, result } => self.dir_opened(target, result),
            WorkspaceMessage::OpenDocument { id, name } => {
                let mut effects = self.note_action(now);
                if self.state.tab(id).is_some() {
                    let selected = self.state.select_tab_by_id(id);
                    return DispatchResult {
                        effects,
                        state_changed: selected,
                    };
                }
                self.state.insert_tab(id, name);
                effects.push(Effect::ReadDocument(id));
                DispatchResult::changed(effects)
            }
            WorkspaceMessage::FileOpened { id, result } => self.file_opened(id, result),
            WorkspaceMessage::Edited { id, edit } => self.edited(id, &edit, now),
            WorkspaceMessage::SaveRequested { id } => {
                let mut effects = self.note_action(now);
                let Some(tab) = self.state.tab_mut(id) else {
                    return DispatchResult {
                        effects,
                        state_changed: false,
                    };
                };
                if tab.loading || !tab.is_dirty() {
                    return DispatchResult {
                        effects,
                        state_changed: false,
                    };
                }
                tab.pending_save_count += 1;
                effects.push(Effect::EnqueueSave(tab.snapshot()));
                tracing::debug!(id = %id, "manual save queued");
                DispatchResult::changed(effects)
            }
            WorkspaceMessage::SelectTab { index } => {
                let effects = self.note_action(now);
                let state_changed = self.state.select_tab(index);
                DispatchResult {
                    effects,
                    state_changed,
                }
            }
            WorkspaceMessage::CloseTab { id } => {
                let mut effects = self.note_action(now);
                let Some(tab) = self.state.close_tab(id) else {
                    return DispatchResult {
                        effects,
                        state_changed: false,
                    };
                };
                if !tab.loading && tab.is_dirty() {
                    tracing::debug!(id = %id, "closing dirty tab; queueing final save");
                    effects.push(Effect::EnqueueSave(tab.snapshot()));
                }
                DispatchResult::changed(effects)
            }
            WorkspaceMessage::UserAction => DispatchResult {
                effects: self.note_action(now),
                state_changed: false,
            },
            WorkspaceMessage::AutosaveScan { generation } => self.autosave_scan(generation, now),
            WorkspaceMessage::QueuedSave { id } => match self.state.tab_mut(id) {
                Some(tab) => {
                    tab.pending_save_count += 1;
                    DispatchResult::changed(Vec::new())
                }
                None => DispatchResult::unchanged(),
            },
            WorkspaceMessage::CompletedSave {
                id,
                error,
                completed_at,
            } => self.completed_save(id, error, completed_at, now),
            WorkspaceMessage::StartSync { kind, generation } => {
                let effects = self.sync.request(kind, generation);
                DispatchResult {
                    state_changed: !effects.is_empty(),
                    effects,
                }
            }
            WorkspaceMessage::SyncResult(report) => self.sync_result(report, now),
            WorkspaceMessage::Shutdown => {
                self.state.closing = true;
                let mut effects: Vec<Effect> = self
                    .state
                    .dirty_tabs()
                    .map(|tab| Effect::EnqueueSave(tab.snapshot()))
                    .collect();
                for tab in self.state.tabs.iter_mut().filter(|t| !t.loading && t.is_dirty()) {
                    tab.pending_save_count += 1;
                }
                effects.push(Effect::Shutdown);
                DispatchResult::changed(effects)
            }
        }
    }

    /// Records a user action; may start a sync when the schedule has backed off far.
    fn note_action(&mut self, now: Instant) -> Vec<Effect> {
        self.state.last_action_at = now;
        self.sync.on_user_action(now)
    }

    fn dir_opened(
        &mut self,
        target: Option<FileId>,
        result: Result<DirListing, CoreError>,
    ) -> DispatchResult {
        match result {
            Err(e) => {
                tracing::warn!(target_id = ?target, error = %e, "open dir failed");
                DispatchResult::unchanged()
            }
            Ok(listing) if self.state.explorer.target == target => {
                self.state.explorer.populate(listing);
                DispatchResult::changed(Vec::new())
            }
            Ok(_) => DispatchResult::unchanged(),
        }
    }

    fn file_opened(&mut self, id: FileId, result: Result<Vec<u8>, CoreError>) -> DispatchResult {
        match result {
            Ok(bytes) => match self.state.tab_mut(id) {
                Some(tab) if tab.loading => {
                    tab.set_content(&bytes);
                    DispatchResult::changed(Vec::new())
                }
                Some(_) => {
                    // A second read from an earlier open; the buffer may hold edits.
                    tracing::debug!(id = %id, "late document read dropped");
                    DispatchResult::unchanged()
                }
                None => DispatchResult::unchanged(),
            },
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "reading document failed");
                let still_loading = self.state.tab(id).is_some_and(|t| t.loading);
                if still_loading {
                    self.state.close_tab(id);
                }
                DispatchResult {
                    effects: Vec::new(),
                    state_changed: still_loading,
                }
            }
        }
    }

    fn edited(&mut self, id: FileId, edit: &TextEdit, now: Instant) -> DispatchResult {
        let mut effects = self.note_action(now);
        let applied = match self.state.tab_mut(id) {
            Some(tab) if !tab.loading => tab.apply_edit(edit),
            _ => false,
        };
        if !applied {
            return DispatchResult {
                effects,
                state_changed: false,
            };
        }

        effects.extend(self.autosave.on_edit(self.state.last_edit_at, now));
        self.state.last_edit_at = Some(now);
        if let Some(tab) = self.state.tab_mut(id) {
            tab.last_edit_at = Some(now);
        }
        DispatchResult::changed(effects)
    }

    fn autosave_scan(&mut self, generation: u64, now: Instant) -> DispatchResult {
        match self
            .autosave
            .on_fire(generation, self.state.last_edit_at, now)
        {
            ScanDecision::Ignore => DispatchResult::unchanged(),
            ScanDecision::Defer(rearm) => DispatchResult {
                effects: vec![rearm],
                state_changed: false,
            },
            ScanDecision::Scan => {
                let mut effects = Vec::new();
                for tab in self.state.tabs.iter_mut().filter(|t| !t.loading && t.is_dirty()) {
                    tab.pending_save_count += 1;
                    effects.push(Effect::EnqueueSave(tab.snapshot()));
                }
                tracing::debug!(queued = effects.len(), "autosave scan");
                DispatchResult {
                    state_changed: !effects.is_empty(),
                    effects,
                }
            }
        }
    }

    fn completed_save(
        &mut self,
        id: FileId,
        error: Option<CoreError>,
        completed_at: Instant,
        now: Instant,
    ) -> DispatchResult {
        if let Some(tab) = self.state.tab_mut(id) {
            if tab.pending_save_count == 0 {
                tracing::debug!(id = %id, "save completed before its queue notice");
            }
            tab.pending_save_count = tab.pending_save_count.saturating_sub(1);
            // Completions may arrive out of submission order; the latest one wins.
            if error.is_none() {
                tab.last_save_at = Some(completed_at);
            }
        }

        let mut effects = Vec::new();
        if let Some(source) = error {
            tracing::warn!(id = %id, error = %source, "save failed");
            self.state
                .bg_errors
                .push(BackgroundError::Save { id, source });
            effects.extend(self.autosave.on_save_failed(now));
        }
        DispatchResult::changed(effects)
    }

    fn sync_result(&mut self, report: SyncReport, now: Instant) -> DispatchResult {
        let SyncReport {
            kind,
            new_status,
            sync_error,
            status_error,
        } = report;

        if let Some(e) = sync_error {
            tracing::warn!(?kind, error = %e, "sync failed");
            self.state.bg_errors.push(BackgroundError::Sync(e));
        }
        if let Some(e) = status_error {
            tracing::warn!(error = %e, "fetching last synced failed");
            self.state.bg_errors.push(BackgroundError::Status(e));
        }
        if let Some(status) = new_status {
            self.state.status = format!("Synced {}", status);
        }

        let rearm = self.sync.on_result(kind, now, self.state.last_action_at);
        if kind == SyncKind::Auto {
            tracing::debug!(next_sync_at = ?self.sync.next_sync_at(), "auto sync finished");
        }
        DispatchResult::changed(vec![rearm])
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/store.rs"]
mod tests;
