use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConfigError;

const EXECUTABLE_EXTENSIONS: &[&str] = &["exe", "app", "bat", "cmd", "com", "msi", "appimage"];

/// Lowercases a process or application name and strips a trailing executable
/// extension, so `Chrome.EXE` and `chrome` compare equal.
pub fn normalize_process_name(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    match lowered.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && EXECUTABLE_EXTENSIONS.contains(&ext) => {
            stem.to_string()
        }
        _ => lowered,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlacklistEntry {
    name: String,
}

impl BlacklistEntry {
    pub fn new(raw: &str) -> Result<Self, ConfigError> {
        let name = normalize_process_name(raw);
        if name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        Ok(Self { name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True when this entry equals, or is contained in, a running process name.
    pub fn matches(&self, process_name: &str) -> bool {
        process_name.contains(self.name.as_str())
    }
}

/// Insertion-ordered set of blacklisted application names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Blacklist {
    entries: Vec<BlacklistEntry>,
}

impl Blacklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a blacklist, rejecting empty names and duplicates.
    pub fn from_names<I, S>(names: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::new();
        for name in names {
            list.add(name.as_ref())?;
        }
        Ok(list)
    }

    pub fn add(&mut self, raw: &str) -> Result<BlacklistEntry, ConfigError> {
        let entry = BlacklistEntry::new(raw)?;
        if self.entries.contains(&entry) {
            return Err(ConfigError::DuplicateEntry(entry.name));
        }
        self.entries.push(entry.clone());
        Ok(entry)
    }

    /// Returns whether the name was present.
    pub fn remove(&mut self, raw: &str) -> bool {
        let target = normalize_process_name(raw);
        let before = self.entries.len();
        self.entries.retain(|entry| entry.name != target);
        before != self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[BlacklistEntry] {
        &self.entries
    }
}

/// Lifecycle token for one blocking overlay. Exists exactly as long as the
/// matching process is seen running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockWindowHandle {
    pub id: Uuid,
    pub entry: BlacklistEntry,
    pub shown_at: DateTime<Utc>,
}

impl BlockWindowHandle {
    pub fn open(entry: BlacklistEntry) -> Self {
        Self {
            id: Uuid::new_v4(),
            entry,
            shown_at: Utc::now(),
        }
    }
}
