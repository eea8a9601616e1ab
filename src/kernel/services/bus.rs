use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::{Duration, Instant};

use crate::kernel::WorkspaceMessage;

/// A message stamped with the moment it entered the stream.
#[derive(Debug)]
pub struct Envelope {
    pub enqueued_at: Instant,
    pub message: WorkspaceMessage,
}

#[derive(Clone)]
pub struct WorkspaceSender {
    tx: Sender<Envelope>,
}

pub struct WorkspaceReceiver {
    rx: Receiver<Envelope>,
}

/// The single stream every producer writes into and the dispatcher drains.
pub fn workspace_bus() -> (WorkspaceSender, WorkspaceReceiver) {
    let (tx, rx) = mpsc::channel();
    (WorkspaceSender { tx }, WorkspaceReceiver { rx })
}

impl WorkspaceSender {
    pub fn send(&self, message: WorkspaceMessage) -> Result<(), mpsc::SendError<Envelope>> {
        self.tx.send(Envelope {
            enqueued_at: Instant::now(),
            message,
        })
    }
}

impl WorkspaceReceiver {
    pub fn recv(&self) -> Option<Envelope> {
        self.rx.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Envelope, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    pub fn try_recv(&self) -> Result<Envelope, TryRecvError> {
        self.rx.try_recv()
    }
}
