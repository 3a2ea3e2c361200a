use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "focusguard")]
#[command(
    about = "Run a timed focus session with an attention alarm, an app blacklist and a volume floor"
)]
#[command(version)]
pub struct Cli {
    /// Session length in minutes
    #[arg(short, long, default_value_t = 25)]
    pub minutes: u32,

    /// Block an application for the session (repeatable)
    ///
    /// Names are matched case-insensitively against running process names,
    /// with executable extensions ignored.
    #[arg(short, long = "block", value_name = "NAME")]
    pub block: Vec<String>,

    /// Minimum system volume (0-100) kept for the alarm
    #[arg(long, value_name = "PERCENT", value_parser = clap::value_parser!(u8).range(0..=100))]
    pub volume_floor: Option<u8>,

    /// Leave system volume alone
    #[arg(long, conflicts_with = "volume_floor")]
    pub no_volume_floor: bool,

    /// Show the distraction alarm without playing a sound
    #[arg(long)]
    pub no_alarm: bool,

    /// Camera device index
    #[arg(long, value_name = "INDEX", default_value_t = 0)]
    pub camera: u32,

    /// Settings file (defaults to the user config directory)
    #[arg(long, value_name = "PATH", env = "FOCUSGUARD_SETTINGS")]
    pub settings: Option<PathBuf>,
}
