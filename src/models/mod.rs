mod attention;
mod blacklist;
mod session;

pub use attention::{AttentionClass, AttentionStatus, Detection};
pub use blacklist::{normalize_process_name, Blacklist, BlacklistEntry, BlockWindowHandle};
pub use session::{DistractionEvent, SessionState, SessionStats};
pub(crate) use session::focus_percent;
