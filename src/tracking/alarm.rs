use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::{sync::watch, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;

use crate::devices::AudioSink;
use crate::settings::AlarmSettings;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// On/off state of the audible alarm. While on, a repeater task replays the
/// tone at a fixed cadence, so the alarm keeps sounding for as long as the
/// user is classified as distracted.
#[derive(Clone)]
pub struct AlarmController {
    on_tx: Arc<watch::Sender<bool>>,
    visual_only: Arc<AtomicBool>,
}

impl AlarmController {
    pub fn new() -> Self {
        let (on_tx, _) = watch::channel(false);
        Self {
            on_tx: Arc::new(on_tx),
            visual_only: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Off -> On. Returns false when already on.
    pub fn turn_on(&self) -> bool {
        self.on_tx.send_if_modified(|on| !std::mem::replace(on, true))
    }

    /// On -> Off. Returns false when already off.
    pub fn turn_off(&self) -> bool {
        self.on_tx.send_if_modified(|on| std::mem::replace(on, false))
    }

    pub fn is_on(&self) -> bool {
        *self.on_tx.borrow()
    }

    /// Set once the audio sink has failed; the alarm is then shown, not heard.
    pub fn is_visual_only(&self) -> bool {
        self.visual_only.load(Ordering::SeqCst)
    }

    pub fn spawn_repeater(
        &self,
        audio: Arc<dyn AudioSink>,
        settings: AlarmSettings,
        cancel_token: CancellationToken,
    ) -> JoinHandle<()> {
        if !settings.enabled {
            self.visual_only.store(true, Ordering::SeqCst);
        }
        tokio::spawn(repeat_loop(
            self.on_tx.subscribe(),
            audio,
            settings,
            self.visual_only.clone(),
            cancel_token,
        ))
    }
}

impl Default for AlarmController {
    fn default() -> Self {
        Self::new()
    }
}

async fn repeat_loop(
    mut on_rx: watch::Receiver<bool>,
    audio: Arc<dyn AudioSink>,
    settings: AlarmSettings,
    visual_only: Arc<AtomicBool>,
    cancel_token: CancellationToken,
) {
    loop {
        if !*on_rx.borrow_and_update() {
            tokio::select! {
                _ = cancel_token.cancelled() => break,
                changed = on_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }
        }

        if !visual_only.load(Ordering::SeqCst) {
            let sink = audio.clone();
            let (frequency_hz, duration_ms) =
                (settings.tone_frequency_hz, settings.tone_duration_ms);
            let played =
                tokio::task::spawn_blocking(move || sink.play_tone(frequency_hz, duration_ms))
                    .await;
            match played {
                Ok(Ok(())) => log_debug!("alarm tone played"),
                Ok(Err(err)) => {
                    log_warn!("alarm tone failed, falling back to visual alarm: {err}");
                    visual_only.store(true, Ordering::SeqCst);
                }
                Err(join_err) => {
                    log_warn!("alarm tone worker failed: {join_err}");
                    visual_only.store(true, Ordering::SeqCst);
                }
            }
        }

        tokio::select! {
            _ = cancel_token.cancelled() => break,
            _ = time::sleep(settings.repeat_interval()) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeviceError;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    #[derive(Default)]
    struct CountingSink {
        tones: AtomicU32,
        fail: bool,
    }

    impl AudioSink for CountingSink {
        fn get_volume(&self) -> Result<u8, DeviceError> {
            Ok(50)
        }

        fn set_volume(&self, _volume: u8) -> Result<(), DeviceError> {
            Ok(())
        }

        fn play_tone(&self, _frequency_hz: u32, _duration_ms: u64) -> Result<(), DeviceError> {
            self.tones.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(DeviceError::Unavailable("no output device".into()))
            } else {
                Ok(())
            }
        }
    }

    fn fast_settings() -> AlarmSettings {
        AlarmSettings {
            tone_duration_ms: 1,
            repeat_interval_ms: 40,
            ..AlarmSettings::default()
        }
    }

    #[test]
    fn transitions_report_edges_only() {
        let alarm = AlarmController::new();
        assert!(alarm.turn_on());
        assert!(!alarm.turn_on());
        assert!(alarm.is_on());
        assert!(alarm.turn_off());
        assert!(!alarm.turn_off());
        assert!(!alarm.is_on());
    }

    #[tokio::test]
    async fn repeats_while_on_and_stops_when_off() {
        let sink = Arc::new(CountingSink::default());
        let alarm = AlarmController::new();
        let token = CancellationToken::new();
        let handle = alarm.spawn_repeater(sink.clone(), fast_settings(), token.clone());

        time::sleep(Duration::from_millis(60)).await;
        assert_eq!(sink.tones.load(Ordering::SeqCst), 0);

        alarm.turn_on();
        time::sleep(Duration::from_millis(150)).await;
        let while_on = sink.tones.load(Ordering::SeqCst);
        assert!(while_on >= 2, "expected repeated tones, got {while_on}");

        alarm.turn_off();
        time::sleep(Duration::from_millis(80)).await;
        let after_off = sink.tones.load(Ordering::SeqCst);
        time::sleep(Duration::from_millis(150)).await;
        assert_eq!(sink.tones.load(Ordering::SeqCst), after_off);

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn failing_sink_degrades_to_visual_only() {
        let sink = Arc::new(CountingSink {
            fail: true,
            ..Default::default()
        });
        let alarm = AlarmController::new();
        let token = CancellationToken::new();
        let handle = alarm.spawn_repeater(sink.clone(), fast_settings(), token.clone());

        alarm.turn_on();
        time::sleep(Duration::from_millis(150)).await;
        assert!(alarm.is_on());
        assert!(alarm.is_visual_only());
        assert_eq!(sink.tones.load(Ordering::SeqCst), 1);

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn disabled_sound_never_plays() {
        let sink = Arc::new(CountingSink::default());
        let alarm = AlarmController::new();
        let token = CancellationToken::new();
        let settings = AlarmSettings {
            enabled: false,
            ..fast_settings()
        };
        let handle = alarm.spawn_repeater(sink.clone(), settings, token.clone());

        alarm.turn_on();
        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(sink.tones.load(Ordering::SeqCst), 0);
        assert!(alarm.is_on());

        token.cancel();
        handle.await.unwrap();
    }
}
