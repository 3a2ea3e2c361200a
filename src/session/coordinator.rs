use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::{
    sync::{broadcast, mpsc, watch, Mutex},
    task::JoinHandle,
    time::Instant,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::devices::{Collaborators, FrameStream};
use crate::enforcement::{blacklist_loop, volume_loop, BlacklistEnforcer, VolumeFloor};
use crate::error::{ConfigError, SessionError, SessionResult};
use crate::models::{Blacklist, BlacklistEntry, SessionState, SessionStats};
use crate::settings::{AlarmSettings, FocusSettings};
use crate::timer::{SessionTimer, TimerEvent};
use crate::tracking::{tracking_loop, AlarmController, TrackingLoop};

use super::shared::{SessionHub, SessionShared};
use super::snapshot::{LoopHealth, SessionEvent, SessionSnapshot};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Played once when a session runs to completion.
const COMPLETION_CHIME: &[(u32, u64)] = &[(1_000, 500), (1_200, 300), (1_400, 200)];

/// Per-session choices made by the caller at start time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub camera_index: u32,
    /// Refuse to start when the camera cannot be opened. When false the
    /// session runs with attention tracking disabled.
    pub require_camera: bool,
    pub alarm_enabled: bool,
    /// `None` leaves system volume alone.
    pub volume_floor: Option<u8>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            camera_index: 0,
            require_camera: true,
            alarm_enabled: true,
            volume_floor: Some(20),
        }
    }
}

impl SessionOptions {
    pub fn from_settings(settings: &FocusSettings) -> Self {
        Self {
            alarm_enabled: settings.alarm.enabled,
            volume_floor: settings
                .enforcement
                .volume_floor_enabled
                .then_some(settings.enforcement.volume_floor),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self.volume_floor {
            Some(floor) if floor > 100 => Err(ConfigError::VolumeFloorOutOfRange(floor)),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Stopped,
    Finished,
}

struct ActiveSession {
    id: String,
    token: CancellationToken,
    timer: Arc<SessionTimer>,
    alarm: AlarmController,
    paused_tx: watch::Sender<bool>,
    options: SessionOptions,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
    pump: JoinHandle<()>,
}

struct CoordinatorInner {
    settings: FocusSettings,
    devices: Collaborators,
    hub: SessionHub,
    blacklist: Arc<Mutex<Blacklist>>,
    /// Held for the whole of start, stop and finish, so lifecycle changes
    /// never interleave.
    active: Mutex<Option<ActiveSession>>,
}

/// Owns the session lifecycle and the loops bound to it.
///
/// Cheap to clone; all clones drive the same session.
#[derive(Clone)]
pub struct FocusCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl FocusCoordinator {
    pub fn new(devices: Collaborators, settings: FocusSettings) -> Self {
        let blacklist = Blacklist::from_names(&settings.enforcement.default_blacklist)
            .unwrap_or_else(|err| {
                log_warn!("ignoring default blacklist from settings: {err}");
                Blacklist::new()
            });

        Self {
            inner: Arc::new(CoordinatorInner {
                settings,
                devices,
                hub: SessionHub::new(),
                blacklist: Arc::new(Mutex::new(blacklist)),
                active: Mutex::new(None),
            }),
        }
    }

    pub fn settings(&self) -> &FocusSettings {
        &self.inner.settings
    }

    /// Starts a session of `duration_minutes`.
    pub async fn start(
        &self,
        duration_minutes: u32,
        blacklist: Blacklist,
        options: SessionOptions,
    ) -> SessionResult<SessionSnapshot> {
        let duration = Duration::from_secs(u64::from(duration_minutes) * 60);
        self.start_for(duration, blacklist, options).await
    }

    pub async fn start_for(
        &self,
        duration: Duration,
        blacklist: Blacklist,
        options: SessionOptions,
    ) -> SessionResult<SessionSnapshot> {
        if duration.as_millis() == 0 {
            return Err(ConfigError::NonPositiveDuration.into());
        }
        options.validate()?;

        let mut active = self.inner.active.lock().await;
        if active.is_some() {
            return Err(SessionError::AlreadyActive);
        }

        let stream = self.open_camera(&options).await?;

        let session_id = Uuid::new_v4().to_string();
        let token = CancellationToken::new();
        let settings = &self.inner.settings;
        let hub = self.inner.hub.clone();

        *self.inner.blacklist.lock().await = blacklist.clone();

        let tracking = match &stream {
            Ok(_) => LoopHealth::Active,
            Err(reason) => LoopHealth::Unavailable(reason.clone()),
        };
        let now = Instant::now();
        hub.update(|s| {
            *s = SessionShared {
                session_id: Some(session_id.clone()),
                state: SessionState::Running,
                started_at: Some(Utc::now()),
                started_instant: Some(now),
                total_ms: duration.as_millis() as u64,
                remaining_ms: duration.as_millis() as u64,
                tracking,
                ..SessionShared::default()
            };
            s.sync_blacklist(&blacklist);
        })
        .await;

        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let timer = Arc::new(SessionTimer::new(settings.timer.tick_interval()));
        timer.start(duration, &token, timer_tx).await?;

        let (paused_tx, paused_rx) = watch::channel(false);
        let alarm = AlarmController::new();
        let alarm_settings = AlarmSettings {
            enabled: options.alarm_enabled,
            ..settings.alarm.clone()
        };

        let mut tasks = Vec::new();
        tasks.push((
            "alarm",
            alarm.spawn_repeater(
                self.inner.devices.audio.clone(),
                alarm_settings,
                token.clone(),
            ),
        ));

        if let Ok(stream) = stream {
            let ctx = TrackingLoop {
                hub: hub.clone(),
                alarm: alarm.clone(),
                detector: self.inner.devices.detector.clone(),
                settings: settings.tracking.clone(),
                paused: paused_rx,
                cancel_token: token.clone(),
            };
            tasks.push(("tracking", tokio::spawn(tracking_loop(ctx, stream))));
        }

        tasks.push((
            "blacklist",
            tokio::spawn(blacklist_loop(
                BlacklistEnforcer::new(self.inner.devices.overlay.clone()),
                self.inner.blacklist.clone(),
                self.inner.devices.processes.clone(),
                hub.clone(),
                settings.enforcement.blacklist_poll(),
                token.clone(),
            )),
        ));

        if let Some(floor) = options.volume_floor {
            tasks.push((
                "volume",
                tokio::spawn(volume_loop(
                    VolumeFloor::new(floor),
                    self.inner.devices.audio.clone(),
                    hub.clone(),
                    settings.enforcement.volume_poll(),
                    token.clone(),
                )),
            ));
        }

        let pump = tokio::spawn(pump_timer_events(
            self.clone(),
            session_id.clone(),
            timer_rx,
            token.clone(),
        ));

        *active = Some(ActiveSession {
            id: session_id.clone(),
            token,
            timer,
            alarm,
            paused_tx,
            options,
            tasks,
            pump,
        });
        drop(active);

        log_info!(
            "focus session {} started for {}s",
            session_id,
            duration.as_secs()
        );
        hub.emit(SessionEvent::StateChanged {
            state: SessionState::Running,
        });
        Ok(hub.snapshot())
    }

    /// Ok(Ok(stream)) when the camera opened, Ok(Err(reason)) when it did not
    /// but the session may run without it.
    async fn open_camera(
        &self,
        options: &SessionOptions,
    ) -> SessionResult<Result<Box<dyn FrameStream>, String>> {
        let frames = self.inner.devices.frames.clone();
        let index = options.camera_index;
        let opened = tokio::task::spawn_blocking(move || frames.open(index))
            .await
            .map_err(|err| SessionError::Task(err.to_string()))?;

        match opened {
            Ok(stream) => Ok(Ok(stream)),
            Err(err) if options.require_camera => Err(SessionError::DeviceUnavailable(err)),
            Err(err) => {
                log_warn!(
                    "camera #{} unavailable, attention tracking disabled: {err}",
                    index
                );
                Ok(Err(err.to_string()))
            }
        }
    }

    /// Freezes the countdown and attention tracking. Blacklist and volume
    /// enforcement keep running. Returns false when already paused.
    pub async fn pause(&self) -> SessionResult<bool> {
        let active = self.inner.active.lock().await;
        let session = active.as_ref().ok_or(SessionError::NotActive)?;
        if !session.timer.pause().await {
            return Ok(false);
        }

        session.paused_tx.send_replace(true);
        let alarm_was_on = session.alarm.turn_off();
        self.inner
            .hub
            .update(|s| {
                s.state = SessionState::Paused;
                s.alarm_on = false;
            })
            .await;

        if alarm_was_on {
            self.inner.hub.emit(SessionEvent::AlarmChanged { on: false });
        }
        self.inner.hub.emit(SessionEvent::StateChanged {
            state: SessionState::Paused,
        });
        log_info!("focus session {} paused", session.id);
        Ok(true)
    }

    /// Returns false when not paused.
    pub async fn resume(&self) -> SessionResult<bool> {
        let active = self.inner.active.lock().await;
        let session = active.as_ref().ok_or(SessionError::NotActive)?;
        if !session.timer.resume().await {
            return Ok(false);
        }

        session.paused_tx.send_replace(false);
        self.inner
            .hub
            .update(|s| s.state = SessionState::Running)
            .await;
        self.inner.hub.emit(SessionEvent::StateChanged {
            state: SessionState::Running,
        });
        log_info!("focus session {} resumed", session.id);
        Ok(true)
    }

    /// Pauses a running session or resumes a paused one. Returns the new state.
    pub async fn toggle_pause(&self) -> SessionResult<SessionState> {
        let state = self.inner.hub.read(|s| s.state).await;
        if !state.is_active() {
            return Err(SessionError::NotActive);
        }
        if state == SessionState::Paused {
            self.resume().await?;
        } else {
            self.pause().await?;
        }
        Ok(self.inner.hub.read(|s| s.state).await)
    }

    /// Ends the session, waits for every loop to exit and returns the final
    /// stats. Safe to call repeatedly; returns `None` when nothing was active.
    pub async fn stop(&self) -> SessionResult<Option<SessionStats>> {
        let mut active = self.inner.active.lock().await;
        let Some(session) = active.take() else {
            let was_finished = self
                .inner
                .hub
                .update(|s| {
                    std::mem::replace(&mut s.state, SessionState::Idle) == SessionState::Finished
                })
                .await;
            if was_finished {
                self.inner.hub.emit(SessionEvent::StateChanged {
                    state: SessionState::Idle,
                });
            }
            return Ok(None);
        };

        session.pump.abort();
        let stats = self.wind_down(session, Outcome::Stopped).await;
        Ok(Some(stats))
    }

    /// Timer expiry. Ignored when the session it belongs to is already gone.
    async fn finish(&self, session_id: &str) {
        let mut active = self.inner.active.lock().await;
        if active.as_ref().map(|s| s.id.as_str()) != Some(session_id) {
            return;
        }
        let Some(session) = active.take() else {
            return;
        };

        // Called from the pump itself; wind_down drops its handle unawaited.
        let sound = session.options.alarm_enabled;
        let stats = self.wind_down(session, Outcome::Finished).await;

        if sound {
            self.play_completion_chime();
        }
        self.inner.hub.emit(SessionEvent::Finished(stats));
    }

    async fn wind_down(&self, session: ActiveSession, outcome: Outcome) -> SessionStats {
        let ActiveSession {
            id,
            token,
            timer,
            alarm,
            tasks,
            ..
        } = session;
        let hub = &self.inner.hub;

        let timer_snapshot = timer.stop().await;
        let alarm_was_on = alarm.turn_off();
        token.cancel();

        for (name, handle) in tasks {
            if let Err(err) = handle.await {
                log_error!("{} loop of session {} ended abnormally: {}", name, id, err);
            }
        }

        let final_state = match outcome {
            Outcome::Stopped => SessionState::Idle,
            Outcome::Finished => SessionState::Finished,
        };

        let stats = hub
            .update(|s| {
                s.state = final_state;
                s.remaining_ms = s.total_ms.saturating_sub(timer_snapshot.active_ms);
                s.progress_percent = timer_snapshot.progress_percent;
                s.alarm_on = false;
                s.tracking = LoopHealth::Idle;
                s.stats()
            })
            .await;

        if alarm_was_on {
            hub.emit(SessionEvent::AlarmChanged { on: false });
        }
        hub.emit(SessionEvent::StateChanged { state: final_state });

        log_info!(
            "focus session {} {}: {:.0}s elapsed, {:.1}% focus, {} distractions",
            id,
            match outcome {
                Outcome::Stopped => "stopped",
                Outcome::Finished => "finished",
            },
            stats.total_elapsed_secs,
            stats.focus_percent(),
            stats.distraction_count
        );
        stats
    }

    fn play_completion_chime(&self) {
        let audio = self.inner.devices.audio.clone();
        tokio::task::spawn_blocking(move || {
            for &(frequency_hz, duration_ms) in COMPLETION_CHIME {
                if let Err(err) = audio.play_tone(frequency_hz, duration_ms) {
                    log_debug!("completion chime skipped: {err}");
                    break;
                }
            }
        });
    }

    pub async fn add_blacklist_entry(&self, name: &str) -> SessionResult<BlacklistEntry> {
        let mut list = self.inner.blacklist.lock().await;
        let entry = list.add(name)?;
        let snapshot = list.clone();
        drop(list);
        self.inner.hub.update(|s| s.sync_blacklist(&snapshot)).await;
        Ok(entry)
    }

    /// Returns whether the name was on the list. The block, if any, is lifted
    /// on the next poll.
    pub async fn remove_blacklist_entry(&self, name: &str) -> bool {
        let mut list = self.inner.blacklist.lock().await;
        let removed = list.remove(name);
        let snapshot = list.clone();
        drop(list);
        self.inner.hub.update(|s| s.sync_blacklist(&snapshot)).await;
        removed
    }

    pub async fn clear_blacklist(&self) {
        let mut list = self.inner.blacklist.lock().await;
        list.clear();
        drop(list);
        self.inner.hub.update(|s| s.blacklist.clear()).await;
    }

    pub async fn blacklist(&self) -> Blacklist {
        self.inner.blacklist.lock().await.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.hub.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.hub.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.hub.events()
    }

    /// Stats so far for the current (or last) session.
    pub async fn stats(&self) -> SessionStats {
        self.inner.hub.read(SessionShared::stats).await
    }

    pub async fn state(&self) -> SessionState {
        self.inner.hub.read(|s| s.state).await
    }
}

/// Forwards timer ticks into the shared state and turns expiry into `finish`.
async fn pump_timer_events(
    coordinator: FocusCoordinator,
    session_id: String,
    mut timer_rx: mpsc::UnboundedReceiver<TimerEvent>,
    cancel_token: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => break,
            event = timer_rx.recv() => event,
        };

        match event {
            Some(TimerEvent::Tick {
                remaining_ms,
                progress_percent,
            }) => {
                coordinator
                    .inner
                    .hub
                    .update(|s| {
                        s.remaining_ms = remaining_ms;
                        s.progress_percent = progress_percent;
                    })
                    .await;
            }
            Some(TimerEvent::Finished { .. }) => {
                coordinator.finish(&session_id).await;
                break;
            }
            None => break,
        }
    }
}
