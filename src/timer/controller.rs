use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::error::ConfigError;

use super::{TimerState, TimerStatus};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub status: TimerStatus,
    pub total_ms: u64,
    pub active_ms: u64,
    pub remaining_ms: u64,
    pub progress_percent: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Tick {
        remaining_ms: u64,
        progress_percent: u8,
    },
    /// Sent once, when the countdown reaches zero while running.
    Finished { active_ms: u64 },
}

/// Pausable countdown for one session. The ticker task lives from `start`
/// until the countdown finishes, `stop` is called, or the session token is
/// cancelled.
pub struct SessionTimer {
    state: Arc<Mutex<TimerState>>,
    ticker: Mutex<Option<(JoinHandle<()>, CancellationToken)>>,
    tick_interval: Duration,
}

impl SessionTimer {
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(TimerState::new())),
            ticker: Mutex::new(None),
            tick_interval,
        }
    }

    pub async fn start(
        &self,
        duration: Duration,
        session_token: &CancellationToken,
        events: mpsc::UnboundedSender<TimerEvent>,
    ) -> Result<(), ConfigError> {
        let total_ms = duration.as_millis() as u64;
        if total_ms == 0 {
            return Err(ConfigError::NonPositiveDuration);
        }

        self.cancel_ticker().await;

        self.state.lock().await.begin(total_ms, Instant::now());

        let token = session_token.child_token();
        let handle = tokio::spawn(ticker_loop(
            self.state.clone(),
            self.tick_interval,
            token.clone(),
            events,
        ));
        *self.ticker.lock().await = Some((handle, token));

        log_info!("timer started for {}ms", total_ms);
        Ok(())
    }

    pub async fn pause(&self) -> bool {
        self.state.lock().await.pause(Instant::now())
    }

    pub async fn resume(&self) -> bool {
        self.state.lock().await.resume(Instant::now())
    }

    /// Stops the countdown and waits for the ticker to exit. No Finished
    /// event is sent after this returns.
    pub async fn stop(&self) -> TimerSnapshot {
        {
            let mut state = self.state.lock().await;
            if matches!(state.status, TimerStatus::Running | TimerStatus::Paused) {
                state.stop(Instant::now());
            }
        }
        self.cancel_ticker().await;
        self.snapshot().await
    }

    pub async fn snapshot(&self) -> TimerSnapshot {
        let state = self.state.lock().await;
        snapshot_of(&state, Instant::now())
    }

    async fn cancel_ticker(&self) {
        let ticker = self.ticker.lock().await.take();
        if let Some((handle, token)) = ticker {
            token.cancel();
            let _ = handle.await;
        }
    }
}

fn snapshot_of(state: &TimerState, now: Instant) -> TimerSnapshot {
    TimerSnapshot {
        status: state.status,
        total_ms: state.total_ms,
        active_ms: state.active_ms_at(now),
        remaining_ms: state.remaining_ms_at(now),
        progress_percent: state.progress_at(now),
    }
}

async fn ticker_loop(
    state: Arc<Mutex<TimerState>>,
    tick_interval: Duration,
    cancel_token: CancellationToken,
    events: mpsc::UnboundedSender<TimerEvent>,
) {
    let mut interval = time::interval(tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_debug!("timer ticker cancelled");
                break;
            }
            _ = interval.tick() => {}
        }

        let event = {
            let mut guard = state.lock().await;
            let now = Instant::now();
            match guard.status {
                TimerStatus::Paused => continue,
                TimerStatus::Running => {}
                TimerStatus::Idle | TimerStatus::Stopped | TimerStatus::Finished => break,
            }

            let remaining_ms = guard.remaining_ms_at(now);
            if remaining_ms == 0 {
                guard.finish();
                TimerEvent::Finished {
                    active_ms: guard.total_ms,
                }
            } else {
                TimerEvent::Tick {
                    remaining_ms,
                    progress_percent: guard.progress_at(now),
                }
            }
        };

        let finished = matches!(event, TimerEvent::Finished { .. });
        let _ = events.send(event);
        if finished {
            log_info!("timer reached zero");
            break;
        }
    }
}
