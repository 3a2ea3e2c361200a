//! System output volume through the platform's own command-line tools.

use std::process::Command;

use crate::error::DeviceError;

/// Reads and writes the default output device's volume (0–100).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemVolume;

impl SystemVolume {
    pub fn is_supported(&self) -> bool {
        cfg!(any(target_os = "macos", target_os = "linux"))
    }

    #[cfg(target_os = "macos")]
    pub fn get(&self) -> Result<u8, DeviceError> {
        let out = run("osascript", &["-e", "output volume of (get volume settings)"])?;
        parse_volume(&out)
    }

    #[cfg(target_os = "macos")]
    pub fn set(&self, volume: u8) -> Result<(), DeviceError> {
        let script = format!("set volume output volume {}", volume.min(100));
        run("osascript", &["-e", &script]).map(|_| ())
    }

    #[cfg(target_os = "linux")]
    pub fn get(&self) -> Result<u8, DeviceError> {
        let out = run("pactl", &["get-sink-volume", "@DEFAULT_SINK@"])?;
        parse_volume(&out)
    }

    #[cfg(target_os = "linux")]
    pub fn set(&self, volume: u8) -> Result<(), DeviceError> {
        let level = format!("{}%", volume.min(100));
        run("pactl", &["set-sink-volume", "@DEFAULT_SINK@", &level]).map(|_| ())
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    pub fn get(&self) -> Result<u8, DeviceError> {
        Err(DeviceError::Unsupported)
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    pub fn set(&self, _volume: u8) -> Result<(), DeviceError> {
        Err(DeviceError::Unsupported)
    }
}

#[allow(dead_code)]
fn run(program: &str, args: &[&str]) -> Result<String, DeviceError> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|err| DeviceError::Unavailable(format!("{program}: {err}")))?;

    if !output.status.success() {
        return Err(DeviceError::EnumerationFailure(format!(
            "{program} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Pulls the first volume figure out of tool output. Handles both a bare
/// number (`osascript`) and pactl's `... 65536 /  42% / -22.6 dB ...` lines.
pub(crate) fn parse_volume(output: &str) -> Result<u8, DeviceError> {
    let percent = output
        .split_whitespace()
        .find_map(|token| token.strip_suffix('%'))
        .and_then(|digits| digits.parse::<u32>().ok());

    let value = match percent {
        Some(value) => value,
        None => output.trim().parse::<u32>().map_err(|_| {
            DeviceError::EnumerationFailure(format!("unreadable volume '{}'", output.trim()))
        })?,
    };

    Ok(value.min(100) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_numbers() {
        assert_eq!(parse_volume("37\n").unwrap(), 37);
    }

    #[test]
    fn parses_pactl_output() {
        let out = "Volume: front-left: 27525 /  42% / -22.60 dB,   \
                   front-right: 27525 /  42% / -22.60 dB\n";
        assert_eq!(parse_volume(out).unwrap(), 42);
    }

    #[test]
    fn clamps_boosted_volume() {
        assert_eq!(parse_volume("Volume: mono: 98304 / 150% / 10.57 dB").unwrap(), 100);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            parse_volume("missing value"),
            Err(DeviceError::EnumerationFailure(_))
        ));
    }
}
