use crate::error::DeviceError;
use crate::models::Detection;

use super::{AttentionDetector, Frame, FrameSource, FrameStream};

/// Frame source for builds without a camera backend. Every open fails, so a
/// session either refuses to start (camera required) or runs with attention
/// tracking disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCamera;

impl FrameSource for NoCamera {
    fn open(&self, device_index: u32) -> Result<Box<dyn FrameStream>, DeviceError> {
        Err(DeviceError::Unavailable(format!(
            "no camera backend available for device #{device_index}"
        )))
    }
}

/// Detector paired with `NoCamera`; never sees a frame in practice.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDetector;

impl AttentionDetector for NoDetector {
    fn detect(&self, _frame: &Frame) -> Result<Detection, DeviceError> {
        Err(DeviceError::DetectionFailure("no attention detector configured".into()))
    }
}
