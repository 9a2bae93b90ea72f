//! The client command grammar.
//!
//! One inbound line maps to exactly one [`Command`]. Parsing is pure and
//! total: anything outside the grammar becomes [`Command::Unparsed`] and is
//! reported back to the sender without touching the rest of the cycle.

/// A single parsed client command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Report the current level and mute state
    Get,
    /// Set the level to an absolute value
    SetAbsolute(u8),
    /// Adjust the level by a signed amount
    Delta(i16),
    /// Engage mute, keeping the desired level persisted
    Mute,
    /// Release mute and restore the persisted level
    Unmute,
    /// Subscribe this connection to state-change notifications
    Watch,
    /// Close this connection
    Quit,
    /// Stop the whole daemon
    Shutdown,
    /// Input that did not match the grammar
    Unparsed,
}

impl Command {
    /// Parse one line of client input.
    ///
    /// The grammar is case-insensitive and tolerant of surrounding
    /// whitespace: `vol`, `vol 40`, `vol +5`, `vol -5`, `mute`, `unmute`,
    /// `watch`, `q`/`quit`, `shutdown`. A sign must be followed directly by
    /// digits (`vol + 5` is not a command). Values are capped at 100, the
    /// top of the level scale.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        let lower = trimmed.to_ascii_lowercase();

        match lower.as_str() {
            "vol" => return Self::Get,
            "mute" => return Self::Mute,
            "unmute" => return Self::Unmute,
            "watch" => return Self::Watch,
            "q" | "quit" => return Self::Quit,
            "shutdown" => return Self::Shutdown,
            _ => {}
        }

        let Some(rest) = lower.strip_prefix("vol") else {
            return Self::Unparsed;
        };
        let rest = rest.trim_start();

        if let Some(digits) = rest.strip_prefix('+') {
            return parse_amount(digits).map_or(Self::Unparsed, |n| Self::Delta(i16::from(n)));
        }
        if let Some(digits) = rest.strip_prefix('-') {
            return parse_amount(digits).map_or(Self::Unparsed, |n| Self::Delta(-i16::from(n)));
        }
        parse_amount(rest).map_or(Self::Unparsed, Self::SetAbsolute)
    }
}

/// Parse a bare digit run into a level amount, capped at 100.
fn parse_amount(digits: &str) -> Option<u8> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Long digit runs still mean "as loud as it goes".
    Some(digits.parse::<u32>().map_or(100, |n| n.min(100)) as u8)
}
