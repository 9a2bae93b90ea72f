//! The settings field catalogue.
//!
//! Every persisted setting the daemon touches is named here. Store access is
//! keyed by [`ConfigField`], so an unknown field is unrepresentable rather
//! than a runtime lookup failure.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A persisted configuration field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigField {
    /// Desired output level, 0-100
    Level,
    /// Whether output is muted
    Mute,
    /// Upper clamp for any level change
    WarningLevel,
    /// Whether the mapped-volume curve is applied on the hardware mixer
    VolumeCurve,
    /// Name of the hardware mixer control
    MixerName,
    /// Whether level changes go to the hardware mixer or the player
    MixerMode,
}

impl ConfigField {
    /// All fields, in storage order.
    pub const ALL: [Self; 6] = [
        Self::Level,
        Self::Mute,
        Self::WarningLevel,
        Self::VolumeCurve,
        Self::MixerName,
        Self::MixerMode,
    ];

    /// The row key this field is stored under.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Level => "level",
            Self::Mute => "mute",
            Self::WarningLevel => "warning_level",
            Self::VolumeCurve => "volume_curve",
            Self::MixerName => "mixer_name",
            Self::MixerMode => "mixer_mode",
        }
    }
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// How level changes reach the audio path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MixerMode {
    /// Drive the ALSA mixer control directly
    #[default]
    Hardware,
    /// Drive the player's software volume
    Software,
}

impl MixerMode {
    /// The value this mode is stored as.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hardware => "hardware",
            Self::Software => "software",
        }
    }
}

impl FromStr for MixerMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hardware" => Ok(Self::Hardware),
            "software" => Ok(Self::Software),
            other => Err(Error::invalid("mixer_mode", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_keys_are_unique() {
        for (i, a) in ConfigField::ALL.iter().enumerate() {
            for b in &ConfigField::ALL[i + 1..] {
                assert_ne!(a.key(), b.key());
            }
        }
    }

    #[test]
    fn test_mixer_mode_round_trip() {
        for mode in [MixerMode::Hardware, MixerMode::Software] {
            assert_eq!(mode.as_str().parse::<MixerMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_mixer_mode_rejects_unknown() {
        assert_matches!(
            "alsa".parse::<MixerMode>(),
            Err(Error::InvalidValue { field: "mixer_mode", .. })
        );
    }
}
