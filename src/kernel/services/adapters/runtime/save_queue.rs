use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

use crate::kernel::SaveRequest;

pub type SaveQueue = BlockingQueue<SaveRequest>;

/// FIFO queue with a blocking pop, for many producers and one consumer.
///
/// Pushing never blocks. A consumer parked in [`BlockingQueue::pop_front`] is
/// woken when the queue goes from empty to non-empty, or when it is closed.
pub struct BlockingQueue<T> {
    inner: Mutex<QueueInner<T>>,
    ready: Condvar,
}

struct QueueInner<T> {
    items: VecDeque<T>,
    closed: bool,
}

impl<T> BlockingQueue<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            ready: Condvar::new(),
        }
    }

    /// Returns false (and drops `item`) once the queue is closed.
    pub fn push_back(&self, item: T) -> bool {
        let mut inner = self.inner.lock();
        if inner.closed {
            return false;
        }
        inner.items.push_back(item);
        if inner.items.len() == 1 {
            self.ready.notify_one();
        }
        true
    }

    /// Blocks while the queue is empty. Returns `None` only after `close`, once drained.
    pub fn pop_front(&self) -> Option<T> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(item) = inner.items.pop_front() {
                return Some(item);
            }
            if inner.closed {
                return None;
            }
            self.ready.wait(&mut inner);
        }
    }

    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        self.ready.notify_all();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/runtime/save_queue.rs"]
mod tests;
