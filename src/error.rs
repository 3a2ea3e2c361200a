use thiserror::Error;

/// Failures reported by the external collaborators (camera, detector,
/// process table, audio output).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeviceError {
    /// The device could not be opened at all.
    #[error("device unavailable: {0}")]
    Unavailable(String),

    /// A single frame could not be read or analysed. Transient.
    #[error("detection failed: {0}")]
    DetectionFailure(String),

    /// A process or audio query failed. Transient.
    #[error("enumeration failed: {0}")]
    EnumerationFailure(String),

    /// The collaborator does not offer this capability on this platform.
    #[error("operation not supported by this backend")]
    Unsupported,
}

/// Caller mistakes that are rejected before any session state changes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("session duration must be greater than zero")]
    NonPositiveDuration,

    #[error("'{0}' is already on the blacklist")]
    DuplicateEntry(String),

    #[error("blacklist entry name is empty")]
    EmptyName,

    #[error("volume floor {0} is outside 0..=100")]
    VolumeFloorOutOfRange(u8),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    DeviceUnavailable(DeviceError),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),

    #[error("a focus session is already active")]
    AlreadyActive,

    #[error("no focus session is active")]
    NotActive,

    #[error("session task failed: {0}")]
    Task(String),
}

impl SessionError {
    pub fn is_duplicate(&self) -> bool {
        matches!(
            self,
            SessionError::InvalidConfiguration(ConfigError::DuplicateEntry(_))
        )
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
