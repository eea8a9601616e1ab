//! notedesk - note workspace coordinator
//!
//! Module layout:
//! - kernel: dispatcher state, messages, effects and the autosave/autosync schedulers
//! - kernel::services: core contract (ports) and worker/runtime implementations (adapters)
//! - app: the workspace driver tying the dispatcher to its runtime

pub mod app;
pub mod kernel;
