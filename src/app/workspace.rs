use std::sync::mpsc::{RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::kernel::services::adapters::WorkspaceRuntime;
use crate::kernel::services::ports::{NoteCore, WorkspaceConfig};
use crate::kernel::services::{workspace_bus, Envelope, WorkspaceReceiver, WorkspaceSender};
use crate::kernel::{Effect, Store, WorkspaceMessage, WorkspaceState};

pub const MAX_DRAIN_PER_PUMP: usize = 256;

const SLOW_QUEUE_WAIT: Duration = Duration::from_millis(50);

/// One open workspace: the dispatcher, its effect runtime and the message stream.
///
/// All state changes happen on the thread that calls [`Workspace::run`],
/// [`Workspace::pump`] or [`Workspace::dispatch`]. Other threads talk to it
/// through [`Workspace::sender`].
pub struct Workspace {
    store: Store,
    runtime: WorkspaceRuntime,
    rx: WorkspaceReceiver,
    tx: WorkspaceSender,
    max_drain: usize,
    closed: bool,
}

impl Workspace {
    pub fn new(core: Arc<dyn NoteCore>, config: &WorkspaceConfig) -> std::io::Result<Self> {
        let (tx, rx) = workspace_bus();
        let runtime = WorkspaceRuntime::new(core.clone(), tx.clone(), config)?;

        let last_synced = core.last_synced_human_string().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "reading last synced failed");
            String::new()
        });
        let now = Instant::now();
        let mut store = Store::new(config, now).with_last_synced(&last_synced);
        let effects = store.start(now);

        let mut workspace = Self {
            store,
            runtime,
            rx,
            tx,
            max_drain: config.max_drain_per_tick.clamp(1, MAX_DRAIN_PER_PUMP),
            closed: false,
        };
        workspace.run_effects(effects);
        tracing::info!(status = %workspace.state().status, "workspace opened");
        Ok(workspace)
    }

    pub fn sender(&self) -> WorkspaceSender {
        self.tx.clone()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn state(&self) -> &WorkspaceState {
        self.store.state()
    }

    pub fn runtime(&self) -> &WorkspaceRuntime {
        &self.runtime
    }

    /// True once a `Shutdown` message has been processed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Dispatches one message on the calling thread and runs its effects.
    pub fn dispatch(&mut self, message: WorkspaceMessage) -> bool {
        if self.closed {
            tracing::debug!(message = message.name(), "workspace closed; message dropped");
            return false;
        }
        let result = self.store.dispatch(message, Instant::now());
        self.run_effects(result.effects);
        result.state_changed
    }

    /// Drains pending messages without blocking. Returns whether any changed state.
    pub fn pump(&mut self) -> bool {
        let mut changed = false;
        let mut drained = 0usize;
        while drained < self.max_drain && !self.closed {
            match self.rx.try_recv() {
                Ok(envelope) => {
                    drained += 1;
                    changed |= self.handle(envelope);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        changed
    }

    /// Blocks processing messages until a `Shutdown` has been handled.
    pub fn run(&mut self, mut invalidate: impl FnMut(&WorkspaceState)) {
        while !self.closed {
            let Some(envelope) = self.rx.recv() else {
                break;
            };
            if self.handle(envelope) {
                invalidate(self.store.state());
            }
        }
    }

    /// Processes messages until `done` holds, the workspace closes or `timeout` passes.
    pub fn run_until(
        &mut self,
        timeout: Duration,
        mut done: impl FnMut(&WorkspaceState) -> bool,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if done(self.store.state()) {
                return true;
            }
            if self.closed {
                return false;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(envelope) => {
                    self.handle(envelope);
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return done(self.store.state());
                }
            }
        }
    }

    fn handle(&mut self, envelope: Envelope) -> bool {
        let queue_wait = envelope.enqueued_at.elapsed();
        if queue_wait > SLOW_QUEUE_WAIT {
            tracing::debug!(
                message = envelope.message.name(),
                queue_wait_ms = queue_wait.as_millis() as u64,
                "message waited in queue"
            );
        }
        self.dispatch(envelope.message)
    }

    /// Applies the save notices left on the bus once the save worker has been
    /// joined, so flushed tabs end clean. Everything else is dropped.
    fn settle_saves(&mut self) {
        while let Ok(envelope) = self.rx.try_recv() {
            match envelope.message {
                message @ (WorkspaceMessage::QueuedSave { .. }
                | WorkspaceMessage::CompletedSave { .. }) => {
                    let result = self.store.dispatch(message, Instant::now());
                    if !result.effects.is_empty() {
                        tracing::debug!(
                            effects = result.effects.len(),
                            "effects after shutdown dropped"
                        );
                    }
                }
                message => {
                    tracing::debug!(message = message.name(), "dropped after shutdown");
                }
            }
        }
    }

    fn run_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Shutdown => {
                    self.runtime.shutdown();
                    self.settle_saves();
                    self.closed = true;
                    tracing::info!("workspace closed");
                }
                effect => self.runtime.run_effect(effect),
            }
        }
    }
}
