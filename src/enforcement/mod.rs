pub mod blacklist;
pub mod volume;

pub use blacklist::{blacklist_loop, matched_entries, BlacklistEnforcer, OverlayChange};
pub use volume::{volume_loop, VolumeFloor};
