//! Mixer control through `amixer` and `mpc`.
//!
//! In hardware mode levels and mute drive the ALSA mixer control named in
//! the settings store, optionally through the mapped-volume curve (`-M`).
//! In software mode levels drive the player's volume via `mpc`; the player
//! has no mute switch, so mute is modelled as volume 0 and the controller
//! restores the persisted level on unmute.

use std::path::Path;
use std::process::Command;

use tracing::{debug, warn};

use sotto_core::{DeviceState, MixerMode};

use crate::error::{DeviceError, DeviceResult};
use crate::Device;

/// Mixer selection, read from the settings store at startup.
#[derive(Debug, Clone)]
pub struct MixerProfile {
    /// ALSA mixer control name (hardware mode)
    pub mixer_name: String,
    /// Hardware mixer or player software volume
    pub mode: MixerMode,
    /// Apply the mapped-volume curve on the hardware mixer
    pub volume_curve: bool,
}

/// [`Device`] implementation over `amixer`/`mpc` subprocesses.
pub struct ShellMixer {
    card: u32,
    profile: MixerProfile,
}

impl ShellMixer {
    /// Create a mixer for the probed ALSA card.
    #[must_use]
    pub fn new(profile: MixerProfile) -> Self {
        Self::with_card(detect_card(), profile)
    }

    /// Create a mixer for a specific ALSA card index.
    #[must_use]
    pub fn with_card(card: u32, profile: MixerProfile) -> Self {
        Self { card, profile }
    }

    fn amixer_args(&self, subcommand: &str, value: Option<&str>) -> Vec<String> {
        let mut args = vec!["-c".to_string(), self.card.to_string()];
        if self.profile.volume_curve {
            args.push("-M".to_string());
        }
        args.push(subcommand.to_string());
        args.push(self.profile.mixer_name.clone());
        if let Some(value) = value {
            args.push(value.to_string());
        }
        args
    }
}

impl Device for ShellMixer {
    fn read(&mut self) -> DeviceResult<DeviceState> {
        match self.profile.mode {
            MixerMode::Hardware => {
                let out = run("amixer", &self.amixer_args("sget", None))?;
                let level = parse_percent(&out)
                    .ok_or_else(|| DeviceError::Parse(format!("no level in: {out}")))?;
                let muted = parse_switch(&out).unwrap_or_else(|| {
                    warn!("No mute switch in amixer output, assuming unmuted");
                    false
                });
                Ok(DeviceState { level, muted })
            }
            MixerMode::Software => {
                let out = run("mpc", &[])?;
                let level = parse_mpc_volume(&out)
                    .ok_or_else(|| DeviceError::Parse(format!("no volume in: {out}")))?;
                Ok(DeviceState { level, muted: level == 0 })
            }
        }
    }

    fn set_volume(&mut self, level: u8) -> DeviceResult<u8> {
        match self.profile.mode {
            MixerMode::Hardware => {
                let value = format!("{level}%");
                let out = run("amixer", &self.amixer_args("sset", Some(&value)))?;
                let applied = parse_percent(&out)
                    .ok_or_else(|| DeviceError::Parse(format!("no level in: {out}")))?;
                if applied != level {
                    debug!(requested = level, applied, "Mixer rounded the requested level");
                }
                Ok(applied)
            }
            MixerMode::Software => {
                let out = run("mpc", &["volume".to_string(), level.to_string()])?;
                Ok(parse_mpc_volume(&out).unwrap_or(level))
            }
        }
    }

    fn set_mute(&mut self, muted: bool) -> DeviceResult<()> {
        match self.profile.mode {
            MixerMode::Hardware => {
                let state = if muted { "mute" } else { "unmute" };
                run("amixer", &self.amixer_args("sset", Some(state)))?;
                Ok(())
            }
            MixerMode::Software => {
                if muted {
                    run("mpc", &["volume".to_string(), "0".to_string()])?;
                }
                // Unmute is the level restore the controller issues next.
                Ok(())
            }
        }
    }
}

/// Probe which ALSA card carries the output device.
fn detect_card() -> u32 {
    if Path::new("/proc/asound/card1/id").exists() { 1 } else { 0 }
}

fn run(program: &'static str, args: &[String]) -> DeviceResult<String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|source| DeviceError::Spawn { program, source })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(DeviceError::Failed { program, stderr });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// First `[NN%]` token in amixer output.
fn parse_percent(out: &str) -> Option<u8> {
    for part in out.split_whitespace() {
        if let Some(inner) = part.strip_prefix('[').and_then(|p| p.strip_suffix("%]")) {
            if let Ok(percent) = inner.parse::<u8>() {
                return Some(percent.min(100));
            }
        }
    }
    None
}

/// Playback switch state in amixer output: `[off]` means muted.
fn parse_switch(out: &str) -> Option<bool> {
    if out.contains("[off]") {
        return Some(true);
    }
    if out.contains("[on]") {
        return Some(false);
    }
    None
}

/// The `volume: NN%` field of mpc status output.
fn parse_mpc_volume(out: &str) -> Option<u8> {
    let rest = out.split("volume:").nth(1)?;
    let token = rest.split_whitespace().next()?;
    token.strip_suffix('%')?.parse::<u8>().ok().map(|p| p.min(100))
}

#[cfg(test)]
mod tests {
    use super::*;

    const AMIXER_OUT: &str = "\
Simple mixer control 'Digital',0
  Capabilities: pvolume pswitch
  Playback channels: Front Left - Front Right
  Limits: Playback 0 - 207
  Front Left: Playback 104 [50%] [-25.50dB] [on]
  Front Right: Playback 104 [50%] [-25.50dB] [on]
";

    const AMIXER_MUTED: &str = "\
Simple mixer control 'Digital',0
  Front Left: Playback 0 [37%] [off]
";

    const MPC_OUT: &str = "volume: 85%   repeat: off   random: off   single: off   consume: off\n";

    #[test]
    fn test_parse_percent() {
        assert_eq!(parse_percent(AMIXER_OUT), Some(50));
        assert_eq!(parse_percent(AMIXER_MUTED), Some(37));
        assert_eq!(parse_percent("no numbers here"), None);
    }

    #[test]
    fn test_parse_switch() {
        assert_eq!(parse_switch(AMIXER_OUT), Some(false));
        assert_eq!(parse_switch(AMIXER_MUTED), Some(true));
        assert_eq!(parse_switch("Limits: Playback 0 - 207"), None);
    }

    #[test]
    fn test_parse_mpc_volume() {
        assert_eq!(parse_mpc_volume(MPC_OUT), Some(85));
        assert_eq!(parse_mpc_volume("volume: n/a   repeat: off"), None);
        assert_eq!(parse_mpc_volume("repeat: off"), None);
    }

    #[test]
    fn test_amixer_args_with_curve() {
        let mixer = ShellMixer::with_card(
            1,
            MixerProfile {
                mixer_name: "Digital".into(),
                mode: MixerMode::Hardware,
                volume_curve: true,
            },
        );
        assert_eq!(mixer.amixer_args("sget", None), ["-c", "1", "-M", "sget", "Digital"]);
        assert_eq!(
            mixer.amixer_args("sset", Some("40%")),
            ["-c", "1", "-M", "sset", "Digital", "40%"]
        );
    }

    #[test]
    fn test_amixer_args_without_curve() {
        let mixer = ShellMixer::with_card(
            0,
            MixerProfile {
                mixer_name: "PCM".into(),
                mode: MixerMode::Hardware,
                volume_curve: false,
            },
        );
        assert_eq!(mixer.amixer_args("sset", Some("mute")), ["-c", "0", "sset", "PCM", "mute"]);
    }
}
