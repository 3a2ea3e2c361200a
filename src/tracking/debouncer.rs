use std::time::Duration;

use tokio::time::Instant;

use crate::models::{AttentionClass, Detection};
use crate::settings::TrackingSettings;

/// Longest gap between two samples that still counts as focus time. Larger
/// gaps mean the loop stalled (camera hiccup, pause) and are not credited.
const MAX_FOCUS_CREDIT: Duration = Duration::from_secs(1);

/// Result of feeding one sample to the debouncer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub class: AttentionClass,
    pub consecutive_miss_frames: u32,
    /// True only on the sample that moved the debouncer into Distracted.
    pub entered_distracted: bool,
    /// Set when that entry passed the cooldown and should be logged.
    pub distraction_at: Option<Instant>,
    pub focus_credit: Duration,
}

/// Turns noisy per-frame detections into a stable attention class.
///
/// A single missed face (blink, motion blur) is not a distraction: the face
/// has to be missing for more than `miss_frame_threshold` consecutive samples.
/// Distraction events are rate limited by `cooldown` against the previous
/// recorded event, so one long look away is counted once.
#[derive(Debug, Clone)]
pub struct AttentionDebouncer {
    miss_frame_threshold: u32,
    cooldown: Duration,
    consecutive_miss_frames: u32,
    distracted: bool,
    last_event_at: Option<Instant>,
    last_sample_at: Option<Instant>,
}

impl AttentionDebouncer {
    pub fn new(miss_frame_threshold: u32, cooldown: Duration) -> Self {
        Self {
            miss_frame_threshold,
            cooldown,
            consecutive_miss_frames: 0,
            distracted: false,
            last_event_at: None,
            last_sample_at: None,
        }
    }

    pub fn from_settings(settings: &TrackingSettings) -> Self {
        Self::new(settings.miss_frame_threshold, settings.distraction_cooldown())
    }

    /// Forget the sample clock, e.g. after a pause, so the gap is not
    /// credited as focus time. Miss counts and the cooldown survive.
    pub fn resync(&mut self) {
        self.last_sample_at = None;
    }

    pub fn observe(&mut self, detection: Detection, now: Instant) -> Observation {
        let since_last_sample = self
            .last_sample_at
            .map(|prev| now.saturating_duration_since(prev))
            .unwrap_or_default();
        self.last_sample_at = Some(now);

        if detection.face_detected {
            self.consecutive_miss_frames = 0;
            self.distracted = false;
        } else {
            self.consecutive_miss_frames = self.consecutive_miss_frames.saturating_add(1);
        }

        let class = match (detection.face_detected, detection.eyes_detected) {
            (true, true) => AttentionClass::Focused,
            (true, false) => AttentionClass::EyesHidden,
            (false, _) if self.consecutive_miss_frames <= self.miss_frame_threshold => {
                AttentionClass::FaceLost
            }
            (false, _) => AttentionClass::Distracted,
        };

        let entered_distracted = class == AttentionClass::Distracted && !self.distracted;
        let mut distraction_at = None;
        if entered_distracted {
            self.distracted = true;
            let cooled_down = self
                .last_event_at
                .map(|prev| now.saturating_duration_since(prev) >= self.cooldown)
                .unwrap_or(true);
            if cooled_down {
                self.last_event_at = Some(now);
                distraction_at = Some(now);
            }
        }

        let focus_credit = if class == AttentionClass::Focused {
            since_last_sample.min(MAX_FOCUS_CREDIT)
        } else {
            Duration::ZERO
        };

        Observation {
            class,
            consecutive_miss_frames: self.consecutive_miss_frames,
            entered_distracted,
            distraction_at,
            focus_credit,
        }
    }
}
