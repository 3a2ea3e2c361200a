#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use focusguard_lib::devices::{
    AttentionDetector, AudioSink, Collaborators, Frame, FrameSource, FrameStream,
    OverlayPresenter, ProcessEnumerator,
};
use focusguard_lib::error::DeviceError;
use focusguard_lib::models::Detection;
use focusguard_lib::session::{FocusCoordinator, SessionOptions};
use focusguard_lib::settings::FocusSettings;

/// Camera whose frames carry no pixels; the detector decides what they show.
#[derive(Default)]
pub struct FakeCamera {
    pub unavailable: bool,
    pub opened: AtomicU32,
    pub closed: Arc<AtomicBool>,
}

struct FakeStream {
    sequence: u64,
    closed: Arc<AtomicBool>,
}

impl FrameSource for FakeCamera {
    fn open(&self, device_index: u32) -> Result<Box<dyn FrameStream>, DeviceError> {
        if self.unavailable {
            return Err(DeviceError::Unavailable(format!("camera #{device_index} is busy")));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeStream {
            sequence: 0,
            closed: self.closed.clone(),
        }))
    }
}

impl FrameStream for FakeStream {
    fn next_frame(&mut self) -> Result<Frame, DeviceError> {
        self.sequence += 1;
        Ok(Frame {
            sequence: self.sequence,
            ..Frame::default()
        })
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Reports whatever the test last set, or fails while `failing` is set.
pub struct FakeDetector {
    current: Mutex<Detection>,
    failing: AtomicBool,
    pub calls: AtomicU64,
}

impl FakeDetector {
    pub fn new(initial: Detection) -> Self {
        Self {
            current: Mutex::new(initial),
            failing: AtomicBool::new(false),
            calls: AtomicU64::new(0),
        }
    }

    pub fn set(&self, detection: Detection) {
        *self.current.lock().unwrap() = detection;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl AttentionDetector for FakeDetector {
    fn detect(&self, _frame: &Frame) -> Result<Detection, DeviceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeviceError::DetectionFailure("lens covered".into()));
        }
        Ok(*self.current.lock().unwrap())
    }
}

#[derive(Default)]
pub struct FakeProcesses {
    running: Mutex<HashSet<String>>,
    failing: AtomicBool,
}

impl FakeProcesses {
    pub fn set(&self, names: &[&str]) {
        *self.running.lock().unwrap() = names.iter().map(|n| n.to_string()).collect();
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl ProcessEnumerator for FakeProcesses {
    fn list_process_names(&self) -> Result<HashSet<String>, DeviceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeviceError::EnumerationFailure("ps timed out".into()));
        }
        Ok(self.running.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct RecordingOverlay {
    calls: Mutex<Vec<String>>,
}

impl RecordingOverlay {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }
}

impl OverlayPresenter for RecordingOverlay {
    fn show(&self, app_name: &str) {
        self.calls.lock().unwrap().push(format!("show:{app_name}"));
    }

    fn hide(&self, app_name: &str) {
        self.calls.lock().unwrap().push(format!("hide:{app_name}"));
    }
}

pub struct FakeAudio {
    pub volume: Mutex<u8>,
    pub volume_control: bool,
    pub tones: Mutex<Vec<u32>>,
    /// Reads fail while set.
    pub failing_reads: AtomicBool,
    /// The next this-many `set_volume` calls fail.
    pub failing_sets: AtomicU32,
    pub sets: AtomicU32,
}

impl FakeAudio {
    pub fn with_volume(volume: u8) -> Self {
        Self {
            volume: Mutex::new(volume),
            volume_control: true,
            tones: Mutex::new(Vec::new()),
            failing_reads: AtomicBool::new(false),
            failing_sets: AtomicU32::new(0),
            sets: AtomicU32::new(0),
        }
    }

    pub fn volume(&self) -> u8 {
        *self.volume.lock().unwrap()
    }

    pub fn tones(&self) -> Vec<u32> {
        self.tones.lock().unwrap().clone()
    }
}

impl AudioSink for FakeAudio {
    fn has_volume_control(&self) -> bool {
        self.volume_control
    }

    fn get_volume(&self) -> Result<u8, DeviceError> {
        if self.failing_reads.load(Ordering::SeqCst) {
            return Err(DeviceError::EnumerationFailure("mixer busy".into()));
        }
        Ok(self.volume())
    }

    fn set_volume(&self, volume: u8) -> Result<(), DeviceError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .failing_sets
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(DeviceError::EnumerationFailure("mixer busy".into()));
        }
        *self.volume.lock().unwrap() = volume;
        Ok(())
    }

    fn play_tone(&self, frequency_hz: u32, _duration_ms: u64) -> Result<(), DeviceError> {
        self.tones.lock().unwrap().push(frequency_hz);
        Ok(())
    }
}

pub struct Harness {
    pub camera: Arc<FakeCamera>,
    pub detector: Arc<FakeDetector>,
    pub processes: Arc<FakeProcesses>,
    pub overlay: Arc<RecordingOverlay>,
    pub audio: Arc<FakeAudio>,
    pub coordinator: FocusCoordinator,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(FakeCamera::default(), FakeAudio::with_volume(50))
    }

    pub fn with(camera: FakeCamera, audio: FakeAudio) -> Self {
        let camera = Arc::new(camera);
        let detector = Arc::new(FakeDetector::new(Detection::focused()));
        let processes = Arc::new(FakeProcesses::default());
        let overlay = Arc::new(RecordingOverlay::default());
        let audio = Arc::new(audio);

        let devices = Collaborators {
            frames: camera.clone(),
            detector: detector.clone(),
            processes: processes.clone(),
            overlay: overlay.clone(),
            audio: audio.clone(),
        };

        Self {
            camera,
            detector,
            processes,
            overlay,
            audio,
            coordinator: FocusCoordinator::new(devices, fast_settings()),
        }
    }
}

/// Every interval shrunk so a whole session fits in well under a second.
pub fn fast_settings() -> FocusSettings {
    let mut settings = FocusSettings::default();
    settings.tracking.miss_frame_threshold = 3;
    settings.tracking.distraction_cooldown_ms = 200;
    settings.tracking.frame_interval_ms = 5;
    settings.tracking.frame_skip = 1;
    settings.timer.tick_interval_ms = 10;
    settings.alarm.tone_duration_ms = 1;
    settings.alarm.repeat_interval_ms = 20;
    settings.enforcement.blacklist_poll_ms = 10;
    settings.enforcement.volume_poll_ms = 10;
    settings
}

pub fn options() -> SessionOptions {
    SessionOptions {
        volume_floor: None,
        ..SessionOptions::default()
    }
}

pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(80)).await;
}
