use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;

use crate::kernel::services::WorkspaceSender;
use crate::kernel::WorkspaceMessage;

enum TimerCommand {
    Arm { after: Duration, generation: u64 },
    Stop,
}

/// Resettable one-shot timer living on the tokio runtime.
///
/// A fire is delivered as a message on the workspace bus, tagged with the
/// generation it was armed with. Arming again replaces the pending fire.
pub struct TimerHandle {
    name: &'static str,
    tx: UnboundedSender<TimerCommand>,
}

impl TimerHandle {
    pub fn spawn(
        handle: &tokio::runtime::Handle,
        name: &'static str,
        bus: WorkspaceSender,
        on_fire: fn(u64) -> WorkspaceMessage,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        handle.spawn(timer_loop(name, rx, bus, on_fire));
        Self { name, tx }
    }

    pub fn arm(&self, after: Duration, generation: u64) {
        if self
            .tx
            .send(TimerCommand::Arm { after, generation })
            .is_err()
        {
            tracing::warn!(timer = self.name, "timer task gone; arm dropped");
        }
    }

    pub fn stop(&self) {
        let _ = self.tx.send(TimerCommand::Stop);
    }
}

async fn timer_loop(
    name: &'static str,
    mut rx: UnboundedReceiver<TimerCommand>,
    bus: WorkspaceSender,
    on_fire: fn(u64) -> WorkspaceMessage,
) {
    let mut pending: Option<(Instant, u64)> = None;
    loop {
        let deadline = pending.map(|(at, _)| at);
        tokio::select! {
            cmd = rx.recv() => match cmd {
                Some(TimerCommand::Arm { after, generation }) => {
                    pending = Some((Instant::now() + after, generation));
                }
                Some(TimerCommand::Stop) => pending = None,
                None => break,
            },
            _ = wait_until(deadline) => {
                let Some((_, generation)) = pending.take() else {
                    continue;
                };
                tracing::trace!(timer = name, generation, "timer fired");
                if bus.send(on_fire(generation)).is_err() {
                    break;
                }
            }
        }
    }
    tracing::debug!(timer = name, "timer task exited");
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/runtime/timer.rs"]
mod tests;
