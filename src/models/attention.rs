use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw output of the attention detector for one frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub face_detected: bool,
    pub eyes_detected: bool,
}

impl Detection {
    pub fn focused() -> Self {
        Self {
            face_detected: true,
            eyes_detected: true,
        }
    }

    pub fn absent() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum AttentionClass {
    /// No sample has been classified yet this session.
    #[default]
    Unknown,
    Focused,
    EyesHidden,
    FaceLost,
    Distracted,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AttentionStatus {
    pub face_detected: bool,
    pub eyes_detected: bool,
    pub consecutive_miss_frames: u32,
    pub last_face_at: Option<DateTime<Utc>>,
    pub classification: AttentionClass,
}
