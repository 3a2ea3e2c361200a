pub mod audio;
pub mod cli;
pub mod devices;
pub mod enforcement;
pub mod error;
pub mod models;
pub mod session;
pub mod settings;
pub mod timer;
pub mod tracking;
pub mod utils;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use tokio::sync::broadcast::error::RecvError;

use audio::SystemAudio;
use cli::Cli;
use devices::{Collaborators, LogOverlay, NoCamera, NoDetector, SysinfoProcesses};
use models::Blacklist;
use session::{FocusCoordinator, SessionEvent, SessionOptions};
use settings::SettingsStore;

/// Headless runner: one focus session driven from the command line, with the
/// machine's real process table and audio.
pub async fn run() -> anyhow::Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();

    let settings_path = cli.settings.clone().unwrap_or_else(SettingsStore::default_path);
    let store = SettingsStore::new(settings_path.clone())
        .with_context(|| format!("failed to load settings from {}", settings_path.display()))?;
    let settings = store.settings();

    let mut blacklist = Blacklist::from_names(&settings.enforcement.default_blacklist)
        .context("invalid default blacklist in settings")?;
    for name in &cli.block {
        match blacklist.add(name) {
            Ok(_) => {}
            Err(err @ error::ConfigError::DuplicateEntry(_)) => warn!("{err}"),
            Err(err) => return Err(err).context("invalid --block value"),
        }
    }

    let mut options = SessionOptions::from_settings(&settings);
    options.camera_index = cli.camera;
    // No camera backend ships with the headless runner.
    options.require_camera = false;
    if cli.no_alarm {
        options.alarm_enabled = false;
    }
    if cli.no_volume_floor {
        options.volume_floor = None;
    } else if let Some(floor) = cli.volume_floor {
        options.volume_floor = Some(floor);
    }

    let devices = Collaborators {
        frames: Arc::new(NoCamera),
        detector: Arc::new(NoDetector),
        processes: Arc::new(SysinfoProcesses::new()),
        overlay: Arc::new(LogOverlay::new()),
        audio: Arc::new(SystemAudio::new()),
    };

    let coordinator = FocusCoordinator::new(devices, settings);
    let mut events = coordinator.events();

    info!("FocusGuard starting a {} minute session...", cli.minutes);
    if blacklist.is_empty() {
        info!("no applications blocked");
    } else {
        info!("blocking {} application(s)", blacklist.len());
    }
    coordinator
        .start(cli.minutes, blacklist, options)
        .await
        .context("failed to start focus session")?;

    let mut progress = tokio::time::interval(std::time::Duration::from_secs(60));
    progress.tick().await;

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                info!("interrupted, stopping session");
                if let Some(stats) = coordinator.stop().await? {
                    info!("{}", serde_json::to_string(&stats)?);
                }
                break;
            }
            _ = progress.tick() => {
                let snapshot = coordinator.snapshot();
                info!(
                    "{}:{:02} left, {:.0}% focused, {} distractions",
                    snapshot.remaining_secs / 60,
                    snapshot.remaining_secs % 60,
                    snapshot.focus_percent,
                    snapshot.distraction_count
                );
            }
            event = events.recv() => match event {
                Ok(SessionEvent::Finished(stats)) => {
                    info!("session complete: {}", serde_json::to_string(&stats)?);
                    // Let the completion chime play out.
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                    break;
                }
                Ok(SessionEvent::VolumeRaised { from, to }) => {
                    info!("volume raised from {from}% to {to}% so the alarm stays audible");
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => warn!("missed {skipped} session events"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    Ok(())
}
