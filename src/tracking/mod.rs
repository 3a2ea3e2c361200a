pub mod alarm;
pub mod debouncer;
pub mod loop_worker;

pub use alarm::AlarmController;
pub use debouncer::{AttentionDebouncer, Observation};
pub use loop_worker::{tracking_loop, TrackingLoop};
