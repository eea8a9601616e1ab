//! Headless workspace core (state/message/effect).

pub mod effect;
pub mod message;
pub mod scheduler;
pub mod services;
pub mod state;
pub mod store;

pub use effect::{Effect, SaveRequest, TimerKind};
pub use message::{SyncKind, SyncReport, TextEdit, WorkspaceMessage};
pub use scheduler::{AutosaveScheduler, ScanDecision, SyncScheduler, TimerSlot};
pub use state::{BackgroundError, DocumentTab, ExplorerState, WorkspaceState};
pub use store::{DispatchResult, Store};
