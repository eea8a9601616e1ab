use ropey::Rope;
use std::time::Duration;

use super::message::SyncKind;
use crate::kernel::services::ports::FileId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Autosave,
    Sync,
}

/// A document snapshot waiting to be written. Consumed exactly once by the save worker.
#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub id: FileId,
    pub content: Rope,
}

impl SaveRequest {
    pub fn new(id: FileId, content: Rope) -> Self {
        Self { id, content }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.content.len_bytes());
        for chunk in self.content.chunks() {
            bytes.extend_from_slice(chunk.as_bytes());
        }
        bytes
    }
}

#[derive(Debug, Clone)]
pub enum Effect {
    ListDir {
        target: Option<FileId>,
    },
    ReadDocument(FileId),
    EnqueueSave(SaveRequest),
    ArmTimer {
        timer: TimerKind,
        after: Duration,
        generation: u64,
    },
    StopTimer {
        timer: TimerKind,
    },
    RunSync(SyncKind),
    Shutdown,
}
