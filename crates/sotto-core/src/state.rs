//! Device state and reply line formatting.

use std::fmt;

/// Physical ground truth reported by the audio device.
///
/// May transiently diverge from the settings cache until the next poll or
/// command-driven write converges them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceState {
    /// Output level, 0-100
    pub level: u8,
    /// Whether output is muted
    pub muted: bool,
}

impl DeviceState {
    /// Compose the status reply line for this state.
    #[must_use]
    pub fn status_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vol: {}, Mute: {}", self.level, if self.muted { "on" } else { "off" })
    }
}

/// Compose the reply line for input that did not match the grammar.
#[must_use]
pub fn parse_error_line(raw: &str) -> String {
    format!("Unable to parse msg: \"{raw}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line() {
        assert_eq!(DeviceState { level: 50, muted: false }.status_line(), "Vol: 50, Mute: off");
        assert_eq!(DeviceState { level: 0, muted: true }.status_line(), "Vol: 0, Mute: on");
    }

    #[test]
    fn test_parse_error_line() {
        assert_eq!(parse_error_line("vol abc"), "Unable to parse msg: \"vol abc\"");
    }
}
