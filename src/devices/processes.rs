use std::collections::HashSet;
use std::sync::Mutex;

use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};

use crate::error::DeviceError;
use crate::models::normalize_process_name;

use super::ProcessEnumerator;

/// Lists running processes through `sysinfo`.
pub struct SysinfoProcesses {
    system: Mutex<System>,
    own_pid: u32,
}

impl SysinfoProcesses {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
            own_pid: std::process::id(),
        }
    }
}

impl Default for SysinfoProcesses {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessEnumerator for SysinfoProcesses {
    fn list_process_names(&self) -> Result<HashSet<String>, DeviceError> {
        let mut system = self
            .system
            .lock()
            .map_err(|_| DeviceError::EnumerationFailure("process table lock poisoned".into()))?;

        // Names only; CPU, memory and disk stats are not needed here.
        system.refresh_processes_specifics(ProcessesToUpdate::All, ProcessRefreshKind::new());

        let names = system
            .processes()
            .iter()
            .filter(|(pid, _)| pid.as_u32() != self.own_pid)
            .map(|(_, process)| normalize_process_name(&process.name().to_string_lossy()))
            .filter(|name| !name.is_empty())
            .collect::<HashSet<_>>();

        if names.is_empty() {
            return Err(DeviceError::EnumerationFailure(
                "process table came back empty".into(),
            ));
        }

        Ok(names)
    }
}
