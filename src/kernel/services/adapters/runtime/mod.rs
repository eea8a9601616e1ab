//! Runtime adapter: executes effects on worker threads and sends results back to the dispatcher.

mod runtime;
mod save_queue;
mod timer;

pub use runtime::{sync_once, WorkspaceRuntime};
pub use save_queue::{BlockingQueue, SaveQueue};
pub use timer::TimerHandle;
