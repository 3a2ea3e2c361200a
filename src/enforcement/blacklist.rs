use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::devices::{OverlayPresenter, ProcessEnumerator};
use crate::models::{Blacklist, BlacklistEntry, BlockWindowHandle};
use crate::session::{BlacklistEntryStatus, LoopHealth, SessionEvent, SessionHub};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Entries of `blacklist` (in blacklist order) that match a running process.
pub fn matched_entries(
    blacklist: &Blacklist,
    process_names: &HashSet<String>,
) -> Vec<BlacklistEntry> {
    blacklist
        .entries()
        .iter()
        .filter(|entry| process_names.iter().any(|name| entry.matches(name)))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayChange {
    Shown(String),
    Hidden(String),
}

/// Owns one overlay handle per blacklisted app that is currently running.
pub struct BlacklistEnforcer {
    overlay: Arc<dyn OverlayPresenter>,
    handles: HashMap<BlacklistEntry, BlockWindowHandle>,
}

impl BlacklistEnforcer {
    pub fn new(overlay: Arc<dyn OverlayPresenter>) -> Self {
        Self {
            overlay,
            handles: HashMap::new(),
        }
    }

    pub fn handles(&self) -> &HashMap<BlacklistEntry, BlockWindowHandle> {
        &self.handles
    }

    /// Shows overlays for newly matched entries and hides the ones whose
    /// process is gone or that left the blacklist.
    pub fn apply(
        &mut self,
        blacklist: &Blacklist,
        process_names: &HashSet<String>,
    ) -> Vec<OverlayChange> {
        let matched = matched_entries(blacklist, process_names);
        let mut changes = Vec::new();

        let stale: Vec<BlacklistEntry> = self
            .handles
            .keys()
            .filter(|entry| !matched.contains(entry))
            .cloned()
            .collect();
        for entry in stale {
            self.overlay.hide(entry.name());
            self.handles.remove(&entry);
            changes.push(OverlayChange::Hidden(entry.name().to_string()));
        }

        for entry in matched {
            if self.handles.contains_key(&entry) {
                continue;
            }
            self.overlay.show(entry.name());
            changes.push(OverlayChange::Shown(entry.name().to_string()));
            self.handles.insert(entry.clone(), BlockWindowHandle::open(entry));
        }

        changes
    }

    /// Hides every outstanding overlay. Called once when the session ends.
    pub fn release_all(&mut self) -> Vec<OverlayChange> {
        let mut released: Vec<BlacklistEntry> = self.handles.keys().cloned().collect();
        released.sort();
        for entry in &released {
            self.overlay.hide(entry.name());
        }
        self.handles.clear();
        released
            .into_iter()
            .map(|entry| OverlayChange::Hidden(entry.name().to_string()))
            .collect()
    }

    pub fn statuses(&self, blacklist: &Blacklist) -> Vec<BlacklistEntryStatus> {
        blacklist
            .entries()
            .iter()
            .map(|entry| {
                let handle = self.handles.get(entry);
                BlacklistEntryStatus {
                    name: entry.name().to_string(),
                    blocked: handle.is_some(),
                    blocked_since: handle.map(|h| h.shown_at),
                }
            })
            .collect()
    }
}

fn emit_changes(hub: &SessionHub, changes: Vec<OverlayChange>) {
    for change in changes {
        match change {
            OverlayChange::Shown(app) => {
                log_info!("blocking '{}'", app);
                hub.emit(SessionEvent::OverlayShown { app });
            }
            OverlayChange::Hidden(app) => {
                log_info!("unblocking '{}'", app);
                hub.emit(SessionEvent::OverlayHidden { app });
            }
        }
    }
}

/// Polls the process table until the session token is cancelled. Keeps
/// running while the session is paused.
pub async fn blacklist_loop(
    mut enforcer: BlacklistEnforcer,
    blacklist: Arc<Mutex<Blacklist>>,
    processes: Arc<dyn ProcessEnumerator>,
    hub: SessionHub,
    poll_interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let list = blacklist.lock().await.clone();
        let enumerator = processes.clone();
        let listed = tokio::task::spawn_blocking(move || enumerator.list_process_names()).await;

        let names = match listed {
            Ok(Ok(names)) => names,
            Ok(Err(err)) => {
                log_warn!("process enumeration failed, retrying next poll: {err}");
                let statuses = enforcer.statuses(&list);
                hub.update(|s| {
                    s.blacklist = statuses;
                    s.blacklist_health = LoopHealth::Degraded(err.to_string());
                })
                .await;
                continue;
            }
            Err(join_err) => {
                log_warn!("process enumeration worker failed: {join_err}");
                hub.update(|s| s.blacklist_health = LoopHealth::Degraded(join_err.to_string()))
                    .await;
                continue;
            }
        };

        // The session may have ended while the process table was being read.
        if cancel_token.is_cancelled() {
            break;
        }

        let changes = enforcer.apply(&list, &names);
        log_debug!(
            "blacklist poll: {} processes, {} blocked",
            names.len(),
            enforcer.handles().len()
        );
        let statuses = enforcer.statuses(&list);
        hub.update(|s| {
            s.blacklist = statuses;
            s.blacklist_health = LoopHealth::Active;
        })
        .await;
        emit_changes(&hub, changes);
    }

    let released = enforcer.release_all();
    let list = blacklist.lock().await.clone();
    let statuses = enforcer.statuses(&list);
    hub.update(|s| {
        s.blacklist = statuses;
        s.blacklist_health = LoopHealth::Idle;
    })
    .await;
    emit_changes(&hub, released);
    log_info!("blacklist enforcement stopped");
}
