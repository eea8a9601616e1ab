//! Application layer: wires the dispatcher to the runtime and drives the message loop.

mod workspace;

pub use workspace::{Workspace, MAX_DRAIN_PER_PUMP};
