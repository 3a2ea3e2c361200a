use serde::{Deserialize, Serialize};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Stopped,
    Finished,
}

/// Countdown bookkeeping. All reads take `now` explicitly so the arithmetic is
/// testable without a clock.
#[derive(Debug, Clone, Default)]
pub struct TimerState {
    pub status: TimerStatus,
    pub total_ms: u64,
    /// Time accumulated in earlier running windows; combines with
    /// `running_anchor` to give the true active duration.
    pub active_ms_baseline: u64,
    pub running_anchor: Option<Instant>,
}

impl TimerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, total_ms: u64, now: Instant) {
        *self = Self {
            status: TimerStatus::Running,
            total_ms,
            active_ms_baseline: 0,
            running_anchor: Some(now),
        };
    }

    pub fn active_ms_at(&self, now: Instant) -> u64 {
        let active = match (self.status, self.running_anchor) {
            (TimerStatus::Running, Some(anchor)) => self
                .active_ms_baseline
                .saturating_add(now.saturating_duration_since(anchor).as_millis() as u64),
            _ => self.active_ms_baseline,
        };
        active.min(self.total_ms)
    }

    pub fn remaining_ms_at(&self, now: Instant) -> u64 {
        match self.status {
            TimerStatus::Idle | TimerStatus::Stopped | TimerStatus::Finished => 0,
            TimerStatus::Running | TimerStatus::Paused => {
                self.total_ms.saturating_sub(self.active_ms_at(now))
            }
        }
    }

    /// `100 - floor(remaining / total * 100)`.
    pub fn progress_at(&self, now: Instant) -> u8 {
        if self.total_ms == 0 {
            return 0;
        }
        match self.status {
            TimerStatus::Idle => 0,
            TimerStatus::Finished => 100,
            TimerStatus::Stopped => {
                progress(self.total_ms - self.active_ms_baseline, self.total_ms)
            }
            TimerStatus::Running | TimerStatus::Paused => {
                progress(self.remaining_ms_at(now), self.total_ms)
            }
        }
    }

    /// Freezes the countdown. Returns false when not running.
    pub fn pause(&mut self, now: Instant) -> bool {
        if self.status != TimerStatus::Running {
            return false;
        }
        self.active_ms_baseline = self.active_ms_at(now);
        self.running_anchor = None;
        self.status = TimerStatus::Paused;
        true
    }

    pub fn resume(&mut self, now: Instant) -> bool {
        if self.status != TimerStatus::Paused {
            return false;
        }
        self.running_anchor = Some(now);
        self.status = TimerStatus::Running;
        true
    }

    pub fn stop(&mut self, now: Instant) {
        self.active_ms_baseline = self.active_ms_at(now);
        self.running_anchor = None;
        self.status = TimerStatus::Stopped;
    }

    pub fn finish(&mut self) {
        self.active_ms_baseline = self.total_ms;
        self.running_anchor = None;
        self.status = TimerStatus::Finished;
    }
}

fn progress(remaining_ms: u64, total_ms: u64) -> u8 {
    let remaining_pct = remaining_ms.saturating_mul(100) / total_ms;
    100u64.saturating_sub(remaining_pct) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn counts_down_and_reports_progress() {
        let t0 = Instant::now();
        let mut state = TimerState::new();
        state.begin(60_000, t0);

        let later = t0 + Duration::from_secs(15);
        assert_eq!(state.remaining_ms_at(later), 45_000);
        assert_eq!(state.progress_at(later), 25);
        assert_eq!(state.progress_at(t0), 0);
    }

    #[test]
    fn progress_rounds_remaining_down() {
        let t0 = Instant::now();
        let mut state = TimerState::new();
        state.begin(60_000, t0);
        // 59.9s remaining -> floor(99.83) = 99 -> progress 1
        assert_eq!(state.progress_at(t0 + Duration::from_millis(100)), 1);
    }

    #[test]
    fn pause_freezes_remaining_time() {
        let t0 = Instant::now();
        let mut state = TimerState::new();
        state.begin(10_000, t0);

        assert!(state.pause(t0 + Duration::from_secs(4)));
        assert!(!state.pause(t0 + Duration::from_secs(5)));
        assert_eq!(state.remaining_ms_at(t0 + Duration::from_secs(9)), 6_000);

        assert!(state.resume(t0 + Duration::from_secs(9)));
        assert_eq!(state.remaining_ms_at(t0 + Duration::from_secs(10)), 5_000);
    }

    #[test]
    fn active_time_never_exceeds_total() {
        let t0 = Instant::now();
        let mut state = TimerState::new();
        state.begin(1_000, t0);
        let late = t0 + Duration::from_secs(5);
        assert_eq!(state.active_ms_at(late), 1_000);
        assert_eq!(state.remaining_ms_at(late), 0);
        assert_eq!(state.progress_at(late), 100);
    }

    #[test]
    fn stop_and_finish_zero_the_countdown() {
        let t0 = Instant::now();
        let mut state = TimerState::new();
        state.begin(10_000, t0);
        state.stop(t0 + Duration::from_secs(3));
        assert_eq!(state.status, TimerStatus::Stopped);
        assert_eq!(state.active_ms_at(t0 + Duration::from_secs(8)), 3_000);
        assert_eq!(state.remaining_ms_at(t0), 0);

        state.finish();
        assert_eq!(state.active_ms_baseline, 10_000);
        assert_eq!(state.progress_at(t0), 100);
    }
}
