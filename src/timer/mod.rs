pub mod controller;
pub mod state;

pub use controller::{SessionTimer, TimerEvent, TimerSnapshot};
pub use state::{TimerState, TimerStatus};
