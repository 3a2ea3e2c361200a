use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::time::Instant;

use crate::models::{
    focus_percent, AttentionStatus, Blacklist, DistractionEvent, SessionState, SessionStats,
};

use super::snapshot::{
    BlacklistEntryStatus, LoopHealth, SessionEvent, SessionSnapshot, VolumeStatus,
};

const EVENT_CAPACITY: usize = 256;

/// Everything the loops and the coordinator share about the current session.
/// Only ever touched through [`SessionHub::update`].
#[derive(Debug, Clone, Default)]
pub struct SessionShared {
    pub session_id: Option<String>,
    pub state: SessionState,
    pub started_at: Option<DateTime<Utc>>,
    pub started_instant: Option<Instant>,
    pub total_ms: u64,
    pub remaining_ms: u64,
    pub progress_percent: u8,
    pub attention: AttentionStatus,
    pub tracking: LoopHealth,
    pub alarm_on: bool,
    pub alarm_visual_only: bool,
    pub focus_secs: f64,
    pub distractions: Vec<DistractionEvent>,
    pub blacklist: Vec<BlacklistEntryStatus>,
    pub blacklist_health: LoopHealth,
    pub volume: VolumeStatus,
}

impl SessionShared {
    pub fn active_ms(&self) -> u64 {
        self.total_ms.saturating_sub(self.remaining_ms)
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats::from_log(
            self.session_id.clone().unwrap_or_default(),
            self.started_at.unwrap_or_else(Utc::now),
            self.focus_secs,
            &self.distractions,
            self.active_ms() as f64 / 1000.0,
        )
    }

    /// Milliseconds since session start on the monotonic clock.
    pub fn offset_ms(&self, now: Instant) -> u64 {
        self.started_instant
            .map(|start| now.saturating_duration_since(start).as_millis() as u64)
            .unwrap_or_default()
    }

    /// Rebuilds the per-entry status list for `list`, keeping the blocked
    /// state of entries that are still present.
    pub fn sync_blacklist(&mut self, list: &Blacklist) {
        let previous = std::mem::take(&mut self.blacklist);
        self.blacklist = list
            .entries()
            .iter()
            .map(|entry| {
                previous
                    .iter()
                    .find(|status| status.name == entry.name())
                    .cloned()
                    .unwrap_or_else(|| BlacklistEntryStatus {
                        name: entry.name().to_string(),
                        blocked: false,
                        blocked_since: None,
                    })
            })
            .collect();
    }

    pub fn to_snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            state: self.state,
            remaining_ms: self.remaining_ms,
            remaining_secs: self.remaining_ms / 1000,
            progress_percent: self.progress_percent,
            attention: self.attention.clone(),
            tracking: self.tracking.clone(),
            alarm_on: self.alarm_on,
            alarm_visual_only: self.alarm_visual_only,
            distraction_count: self.distractions.len() as u32,
            focus_percent: focus_percent(self.focus_secs, self.active_ms() as f64 / 1000.0),
            blacklist: self.blacklist.clone(),
            blacklist_health: self.blacklist_health.clone(),
            volume: self.volume.clone(),
        }
    }
}

/// The one synchronization point for session state.
///
/// Writers lock, mutate, and publish a fresh snapshot before unlocking. The
/// lock is never held across a collaborator call.
#[derive(Clone)]
pub struct SessionHub {
    shared: Arc<Mutex<SessionShared>>,
    snapshot_tx: Arc<watch::Sender<SessionSnapshot>>,
    events_tx: broadcast::Sender<SessionEvent>,
}

impl SessionHub {
    pub fn new() -> Self {
        let (snapshot_tx, _) = watch::channel(SessionSnapshot::default());
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Mutex::new(SessionShared::default())),
            snapshot_tx: Arc::new(snapshot_tx),
            events_tx,
        }
    }

    pub async fn update<R>(&self, f: impl FnOnce(&mut SessionShared) -> R) -> R {
        let mut guard = self.shared.lock().await;
        let result = f(&mut guard);
        self.snapshot_tx.send_replace(guard.to_snapshot());
        result
    }

    pub async fn read<R>(&self, f: impl FnOnce(&SessionShared) -> R) -> R {
        let guard = self.shared.lock().await;
        f(&guard)
    }

    pub fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events_tx.send(event);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events_tx.subscribe()
    }
}

impl Default for SessionHub {
    fn default() -> Self {
        Self::new()
    }
}
