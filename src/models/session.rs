use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    #[default]
    Idle,
    Running,
    Paused,
    Finished,
}

impl SessionState {
    /// Running or Paused: the enforcement loops are alive.
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Running | SessionState::Paused)
    }
}

/// A debounced, cooldown-gated "user looked away" record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DistractionEvent {
    pub timestamp: DateTime<Utc>,
    /// Monotonic offset from session start; strictly increasing within a log.
    pub session_offset_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub focus_accumulated_secs: f64,
    pub distraction_count: u32,
    pub total_elapsed_secs: f64,
}

impl SessionStats {
    pub fn from_log(
        session_id: String,
        started_at: DateTime<Utc>,
        focus_accumulated_secs: f64,
        distractions: &[DistractionEvent],
        total_elapsed_secs: f64,
    ) -> Self {
        Self {
            session_id,
            started_at,
            focus_accumulated_secs,
            distraction_count: distractions.len() as u32,
            total_elapsed_secs,
        }
    }

    pub fn focus_percent(&self) -> f64 {
        focus_percent(self.focus_accumulated_secs, self.total_elapsed_secs)
    }
}

pub(crate) fn focus_percent(focus_secs: f64, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= 0.0 {
        return 0.0;
    }
    (focus_secs / elapsed_secs * 100.0).clamp(0.0, 100.0)
}
