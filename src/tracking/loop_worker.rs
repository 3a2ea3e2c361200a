use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::devices::{AttentionDetector, FrameStream};
use crate::error::DeviceError;
use crate::models::{AttentionClass, Detection, DistractionEvent};
use crate::session::{LoopHealth, SessionEvent, SessionHub};
use crate::settings::TrackingSettings;

use super::{AlarmController, AttentionDebouncer};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Everything the camera loop needs for one session.
pub struct TrackingLoop {
    pub hub: SessionHub,
    pub alarm: AlarmController,
    pub detector: Arc<dyn AttentionDetector>,
    pub settings: TrackingSettings,
    pub paused: watch::Receiver<bool>,
    pub cancel_token: CancellationToken,
}

/// Frame source -> detector -> debouncer -> alarm, until the session ends.
/// Owns the frame stream and closes it on exit.
pub async fn tracking_loop(ctx: TrackingLoop, mut stream: Box<dyn FrameStream>) {
    let TrackingLoop {
        hub,
        alarm,
        detector,
        settings,
        mut paused,
        cancel_token,
    } = ctx;

    let mut debouncer = AttentionDebouncer::from_settings(&settings);
    let frame_skip = u64::from(settings.frame_skip.max(1));
    let mut frame_counter: u64 = 0;
    let mut failing = false;

    hub.update(|s| s.tracking = LoopHealth::Active).await;

    loop {
        if *paused.borrow_and_update() {
            debouncer.resync();
            tokio::select! {
                _ = cancel_token.cancelled() => break,
                changed = paused.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }
        }
        if cancel_token.is_cancelled() {
            break;
        }

        frame_counter = frame_counter.wrapping_add(1);
        let sample = frame_counter % frame_skip == 0;

        let worker_detector = detector.clone();
        let read = tokio::task::spawn_blocking(move || {
            let result = read_and_detect(stream.as_mut(), worker_detector.as_ref(), sample);
            (stream, result)
        })
        .await;

        let detection = match read {
            Ok((returned, result)) => {
                stream = returned;
                result
            }
            Err(join_err) => {
                // The stream went down with the worker; nothing left to close.
                log_error!("frame worker panicked, attention tracking stopped: {join_err}");
                hub.update(|s| s.tracking = LoopHealth::Unavailable(join_err.to_string()))
                    .await;
                return;
            }
        };

        match detection {
            Ok(None) => continue,
            Ok(Some(detection)) => {
                if failing {
                    failing = false;
                    log_info!("attention tracking recovered");
                }
                apply_sample(&hub, &alarm, &mut debouncer, detection, &paused).await;
            }
            Err(err) => {
                if !failing {
                    failing = true;
                    log_warn!("frame skipped: {err}");
                }
                hub.update(|s| s.tracking = LoopHealth::Degraded(err.to_string()))
                    .await;
            }
        }

        tokio::select! {
            _ = cancel_token.cancelled() => break,
            _ = time::sleep(settings.frame_interval()) => {}
        }
    }

    let closed = tokio::task::spawn_blocking(move || stream.close()).await;
    if let Err(err) = closed {
        log_error!("failed to release camera: {err}");
    }
    log_info!("attention tracking stopped, camera released");
}

fn read_and_detect(
    stream: &mut dyn FrameStream,
    detector: &dyn AttentionDetector,
    sample: bool,
) -> Result<Option<Detection>, DeviceError> {
    let frame = stream.next_frame()?;
    if !sample {
        return Ok(None);
    }
    detector.detect(&frame).map(Some)
}

async fn apply_sample(
    hub: &SessionHub,
    alarm: &AlarmController,
    debouncer: &mut AttentionDebouncer,
    detection: Detection,
    paused: &watch::Receiver<bool>,
) {
    let now = Instant::now();
    let observation = debouncer.observe(detection, now);

    // A sample that raced a pause must not restart the alarm.
    let alarm_changed = match observation.class {
        AttentionClass::Focused => alarm.turn_off(),
        AttentionClass::Distracted if !*paused.borrow() => alarm.turn_on(),
        _ => false,
    };

    let recorded = hub
        .update(|s| {
            s.tracking = LoopHealth::Active;
            s.attention.face_detected = detection.face_detected;
            s.attention.eyes_detected = detection.eyes_detected;
            s.attention.consecutive_miss_frames = observation.consecutive_miss_frames;
            s.attention.classification = observation.class;
            if detection.face_detected {
                s.attention.last_face_at = Some(Utc::now());
            }
            s.focus_secs += observation.focus_credit.as_secs_f64();
            s.alarm_on = alarm.is_on();
            s.alarm_visual_only = alarm.is_visual_only();

            observation.distraction_at.map(|at| {
                let event = DistractionEvent {
                    timestamp: Utc::now(),
                    session_offset_ms: s.offset_ms(at),
                };
                s.distractions.push(event);
                event
            })
        })
        .await;

    if alarm_changed {
        hub.emit(SessionEvent::AlarmChanged { on: alarm.is_on() });
    }
    if let Some(event) = recorded {
        log_info!("distraction recorded at +{}ms", event.session_offset_ms);
        hub.emit(SessionEvent::DistractionRecorded(event));
    }
}
