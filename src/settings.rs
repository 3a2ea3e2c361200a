use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

/// Debounce tunables for the camera loop. The defaults were measured on a
/// webcam at roughly 20 processed frames per second.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackingSettings {
    /// Consecutive no-face samples tolerated before the user counts as away.
    pub miss_frame_threshold: u32,
    pub distraction_cooldown_ms: u64,
    /// Pause between processed frames.
    pub frame_interval_ms: u64,
    /// Only every n-th frame goes to the detector.
    pub frame_skip: u32,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            miss_frame_threshold: 15,
            distraction_cooldown_ms: 3_000,
            frame_interval_ms: 50,
            frame_skip: 2,
        }
    }
}

impl TrackingSettings {
    pub fn distraction_cooldown(&self) -> Duration {
        Duration::from_millis(self.distraction_cooldown_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct TimerSettings {
    pub tick_interval_ms: u64,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
        }
    }
}

impl TimerSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.clamp(1, 100))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AlarmSettings {
    pub enabled: bool,
    pub tone_frequency_hz: u32,
    pub tone_duration_ms: u64,
    pub repeat_interval_ms: u64,
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            tone_frequency_hz: 1_000,
            tone_duration_ms: 300,
            repeat_interval_ms: 1_000,
        }
    }
}

impl AlarmSettings {
    pub fn repeat_interval(&self) -> Duration {
        Duration::from_millis(self.repeat_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EnforcementSettings {
    pub blacklist_poll_ms: u64,
    pub volume_poll_ms: u64,
    pub volume_floor_enabled: bool,
    pub volume_floor: u8,
    /// Applications blocked when the caller does not pass its own list.
    pub default_blacklist: Vec<String>,
}

impl Default for EnforcementSettings {
    fn default() -> Self {
        Self {
            blacklist_poll_ms: 2_000,
            volume_poll_ms: 1_000,
            volume_floor_enabled: true,
            volume_floor: 20,
            default_blacklist: Vec::new(),
        }
    }
}

impl EnforcementSettings {
    pub fn blacklist_poll(&self) -> Duration {
        Duration::from_millis(self.blacklist_poll_ms.max(1))
    }

    pub fn volume_poll(&self) -> Duration {
        Duration::from_millis(self.volume_poll_ms.max(1))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FocusSettings {
    pub tracking: TrackingSettings,
    pub timer: TimerSettings,
    pub alarm: AlarmSettings,
    pub enforcement: EnforcementSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<FocusSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!("Ignoring malformed settings in {}: {err}", path.display());
                FocusSettings::default()
            })
        } else {
            FocusSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// `<config dir>/focusguard/settings.json`, falling back to the working
    /// directory when the platform has no config dir.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("focusguard"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("settings.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> FocusSettings {
        self.read().clone()
    }

    pub fn update(&self, settings: FocusSettings) -> Result<()> {
        let mut guard = self.write();
        *guard = settings;
        self.persist(&guard)
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: FocusSettings = serde_json::from_str(&contents)
            .with_context(|| format!("Malformed settings in {}", self.path.display()))?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &FocusSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, FocusSettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, FocusSettings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
