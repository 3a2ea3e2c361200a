use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{AttentionStatus, DistractionEvent, SessionState, SessionStats};

/// Health of one background loop, as shown to the user.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", tag = "status", content = "detail")]
pub enum LoopHealth {
    /// Not running (no session, or switched off for this session).
    #[default]
    Idle,
    Active,
    /// Last iteration failed; retried at the next interval.
    Degraded(String),
    /// The backend cannot do this at all; the loop has given up.
    Unavailable(String),
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlacklistEntryStatus {
    pub name: String,
    pub blocked: bool,
    pub blocked_since: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct VolumeStatus {
    pub health: LoopHealth,
    pub current: Option<u8>,
    pub floor: Option<u8>,
}

/// Read-only view of the session for presentation layers.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: Option<String>,
    pub state: SessionState,
    pub remaining_ms: u64,
    pub remaining_secs: u64,
    pub progress_percent: u8,
    pub attention: AttentionStatus,
    pub tracking: LoopHealth,
    pub alarm_on: bool,
    pub alarm_visual_only: bool,
    pub distraction_count: u32,
    pub focus_percent: f64,
    pub blacklist: Vec<BlacklistEntryStatus>,
    pub blacklist_health: LoopHealth,
    pub volume: VolumeStatus,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", tag = "type", content = "payload")]
pub enum SessionEvent {
    StateChanged { state: SessionState },
    DistractionRecorded(DistractionEvent),
    AlarmChanged { on: bool },
    OverlayShown { app: String },
    OverlayHidden { app: String },
    VolumeRaised { from: u8, to: u8 },
    Finished(SessionStats),
}
