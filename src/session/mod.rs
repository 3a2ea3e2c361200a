//! Session lifecycle and the state shared between its loops.

mod coordinator;
mod shared;
mod snapshot;

pub use coordinator::{FocusCoordinator, SessionOptions};
pub use shared::{SessionHub, SessionShared};
pub use snapshot::{BlacklistEntryStatus, LoopHealth, SessionEvent, SessionSnapshot, VolumeStatus};
