use std::collections::HashSet;
use std::sync::Mutex;

use log::{info, warn};

use super::OverlayPresenter;

/// Overlay presenter that only records and logs requests. Used by the headless
/// runner, where there is no display surface to cover.
#[derive(Debug, Default)]
pub struct LogOverlay {
    visible: Mutex<HashSet<String>>,
}

impl LogOverlay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OverlayPresenter for LogOverlay {
    fn show(&self, app_name: &str) {
        let mut guard = match self.visible.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.insert(app_name.to_string()) {
            warn!("BLOCKED: '{}' is blacklisted, close it to continue", app_name);
        }
    }

    fn hide(&self, app_name: &str) {
        let mut guard = match self.visible.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.remove(app_name) {
            info!("'{}' closed, block lifted", app_name);
        }
    }
}
