//! Seams to the outside world. The coordinator only ever talks to these
//! traits. Camera, detector, process and audio calls are made from
//! `spawn_blocking`, so those may block on the OS; overlay calls must return
//! promptly.

pub mod camera;
pub mod overlay;
pub mod processes;

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::DeviceError;
use crate::models::Detection;

pub use camera::{NoCamera, NoDetector};
pub use overlay::LogOverlay;
pub use processes::SysinfoProcesses;

/// One captured video frame. The pixel layout is whatever the frame source
/// and the attention detector agree on.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

pub trait AttentionDetector: Send + Sync {
    fn detect(&self, frame: &Frame) -> Result<Detection, DeviceError>;
}

/// Opens camera devices.
pub trait FrameSource: Send + Sync {
    fn open(&self, device_index: u32) -> Result<Box<dyn FrameStream>, DeviceError>;
}

/// An opened camera. Not restartable: once closed, open a new stream.
pub trait FrameStream: Send {
    fn next_frame(&mut self) -> Result<Frame, DeviceError>;
    fn close(&mut self);
}

pub trait ProcessEnumerator: Send + Sync {
    /// Names of running processes, lowercase with executable extensions stripped.
    fn list_process_names(&self) -> Result<HashSet<String>, DeviceError>;
}

/// Full-screen blocking surface. `show` and `hide` must be idempotent.
pub trait OverlayPresenter: Send + Sync {
    fn show(&self, app_name: &str);
    fn hide(&self, app_name: &str);
}

pub trait AudioSink: Send + Sync {
    /// Capability check. When false, `get_volume`/`set_volume` return
    /// `DeviceError::Unsupported` and the volume floor runs degraded.
    fn has_volume_control(&self) -> bool {
        true
    }

    fn get_volume(&self) -> Result<u8, DeviceError>;
    fn set_volume(&self, volume: u8) -> Result<(), DeviceError>;

    /// Plays a tone and returns once it has finished.
    fn play_tone(&self, frequency_hz: u32, duration_ms: u64) -> Result<(), DeviceError>;
}

/// The set of collaborators one coordinator drives.
#[derive(Clone)]
pub struct Collaborators {
    pub frames: Arc<dyn FrameSource>,
    pub detector: Arc<dyn AttentionDetector>,
    pub processes: Arc<dyn ProcessEnumerator>,
    pub overlay: Arc<dyn OverlayPresenter>,
    pub audio: Arc<dyn AudioSink>,
}
