use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use super::save_queue::SaveQueue;
use super::timer::TimerHandle;
use crate::kernel::services::ports::{list_dir, FileId, NoteCore, SyncProgress, WorkspaceConfig};
use crate::kernel::services::WorkspaceSender;
use crate::kernel::{Effect, SaveRequest, SyncKind, SyncReport, TimerKind, WorkspaceMessage};

/// Executes dispatcher effects and feeds the results back as messages.
///
/// Core calls never run on the caller's thread: saves go through the single
/// save worker, everything else through the tokio blocking pool.
pub struct WorkspaceRuntime {
    runtime: tokio::runtime::Runtime,
    core: Arc<dyn NoteCore>,
    tx: WorkspaceSender,
    saves: Arc<SaveQueue>,
    save_worker: Option<JoinHandle<()>>,
    autosave_timer: TimerHandle,
    sync_timer: TimerHandle,
}

impl WorkspaceRuntime {
    pub fn new(
        core: Arc<dyn NoteCore>,
        tx: WorkspaceSender,
        config: &WorkspaceConfig,
    ) -> std::io::Result<Self> {
        let runtime = build_runtime()?;

        let saves = Arc::new(SaveQueue::with_capacity(config.save_queue_capacity));
        let save_worker = {
            let core = core.clone();
            let saves = saves.clone();
            let tx = tx.clone();
            std::thread::Builder::new()
                .name("notedesk-save".to_string())
                .spawn(move || save_loop(core.as_ref(), &saves, &tx))?
        };

        let autosave_timer = TimerHandle::spawn(
            runtime.handle(),
            "autosave",
            tx.clone(),
            |generation| WorkspaceMessage::AutosaveScan { generation },
        );
        let sync_timer = TimerHandle::spawn(runtime.handle(), "sync", tx.clone(), |generation| {
            WorkspaceMessage::StartSync {
                kind: SyncKind::Auto,
                generation: Some(generation),
            }
        });

        Ok(Self {
            runtime,
            core,
            tx,
            saves,
            save_worker: Some(save_worker),
            autosave_timer,
            sync_timer,
        })
    }

    pub fn tokio_handle(&self) -> tokio::runtime::Handle {
        self.runtime.handle().clone()
    }

    pub fn pending_saves(&self) -> usize {
        self.saves.len()
    }

    pub fn run_effect(&self, effect: Effect) {
        match effect {
            Effect::ListDir { target } => self.list_dir(target),
            Effect::ReadDocument(id) => self.read_document(id),
            Effect::EnqueueSave(request) => self.enqueue_save(request),
            Effect::ArmTimer {
                timer,
                after,
                generation,
            } => self.timer(timer).arm(after, generation),
            Effect::StopTimer { timer } => self.timer(timer).stop(),
            Effect::RunSync(kind) => self.run_sync(kind),
            Effect::Shutdown => tracing::debug!("shutdown effect reached the runtime"),
        }
    }

    /// Queues a save produced outside the dispatcher, announcing it first so
    /// the tab counts it as in flight.
    pub fn submit_save(&self, request: SaveRequest) {
        let _ = self.tx.send(WorkspaceMessage::QueuedSave { id: request.id });
        self.enqueue_save(request);
    }

    /// Lets the save worker drain what is already queued, then joins it.
    pub fn shutdown(&mut self) {
        self.saves.close();
        self.autosave_timer.stop();
        self.sync_timer.stop();
        if let Some(worker) = self.save_worker.take() {
            if worker.join().is_err() {
                tracing::error!("save worker panicked");
            }
        }
    }

    fn timer(&self, timer: TimerKind) -> &TimerHandle {
        match timer {
            TimerKind::Autosave => &self.autosave_timer,
            TimerKind::Sync => &self.sync_timer,
        }
    }

    fn enqueue_save(&self, request: SaveRequest) {
        let id = request.id;
        if !self.saves.push_back(request) {
            tracing::warn!(id = %id, "save queue closed; save dropped");
        }
    }

    fn list_dir(&self, target: Option<FileId>) {
        let core = self.core.clone();
        let tx = self.tx.clone();
        self.runtime.spawn_blocking(move || {
            let result = list_dir(core.as_ref(), target);
            let _ = tx.send(WorkspaceMessage::DirOpened { target, result });
        });
    }

    fn read_document(&self, id: FileId) {
        let core = self.core.clone();
        let tx = self.tx.clone();
        self.runtime.spawn_blocking(move || {
            let result = core.read_document(id);
            let _ = tx.send(WorkspaceMessage::FileOpened { id, result });
        });
    }

    fn run_sync(&self, kind: SyncKind) {
        let core = self.core.clone();
        let tx = self.tx.clone();
        self.runtime.spawn_blocking(move || {
            let report = sync_once(core.as_ref(), kind);
            let _ = tx.send(WorkspaceMessage::SyncResult(report));
        });
    }
}

impl Drop for WorkspaceRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn build_runtime() -> std::io::Result<tokio::runtime::Runtime> {
    match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("notedesk-rt")
        .enable_all()
        .build()
    {
        Ok(runtime) => Ok(runtime),
        Err(e) => {
            tracing::warn!(error = %e, "two-worker runtime unavailable; using one worker");
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .thread_name("notedesk-rt")
                .enable_all()
                .build()
        }
    }
}

/// Runs one sync session: `sync_all`, then the status refresh if it succeeded.
pub fn sync_once(core: &dyn NoteCore, kind: SyncKind) -> SyncReport {
    let mut on_progress = |p: SyncProgress| {
        tracing::debug!(
            progress = p.progress,
            total = p.total,
            current = ?p.current,
            "sync progress"
        );
    };

    let started = Instant::now();
    let mut report = SyncReport {
        kind,
        new_status: None,
        sync_error: None,
        status_error: None,
    };
    match core.sync_all(&mut on_progress) {
        Ok(()) => match core.last_synced_human_string() {
            Ok(status) => report.new_status = Some(status),
            Err(e) => report.status_error = Some(e),
        },
        Err(e) => report.sync_error = Some(e),
    }
    tracing::debug!(
        ?kind,
        ok = report.sync_error.is_none(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "sync session finished"
    );
    report
}

/// Body of the save worker thread. Exactly one write is in flight at a time.
fn save_loop(core: &dyn NoteCore, saves: &SaveQueue, tx: &WorkspaceSender) {
    tracing::debug!("save worker started");
    while let Some(request) = saves.pop_front() {
        let bytes = request.to_bytes();
        let error = core.write_document(request.id, &bytes).err();
        if let Some(e) = &error {
            tracing::warn!(id = %request.id, error = %e, "write_document failed");
        } else {
            tracing::trace!(id = %request.id, bytes = bytes.len(), "document written");
        }
        let _ = tx.send(WorkspaceMessage::CompletedSave {
            id: request.id,
            error,
            completed_at: Instant::now(),
        });
    }
    tracing::debug!("save worker exited");
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/runtime/runtime.rs"]
mod tests;
