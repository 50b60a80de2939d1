//! Telnet IAC (Interpret-As-Command) filtering.
//!
//! A Telnet client signals option negotiation by sending the marker byte
//! `0xFF` followed by a command byte and an option byte, for example
//! `FF FB 03` ("IAC WILL SUPPRESS-GO-AHEAD").  Raw-mode clients never send
//! these, but PuTTY and the classic `telnet` binary do as soon as they
//! connect.
//!
//! # Filtering rule
//!
//! ```text
//! input:    41 FF FB 01 42
//!              └──────┘
//!              dropped as a unit
//! filtered: 41 42
//! ```
//!
//! Every `0xFF` consumes itself plus the next two bytes, whatever they are.
//! There is no state carried between calls, so a sequence split across two
//! TCP reads is only partially recognised: the bytes up to the end of the
//! first buffer are dropped and the remainder of the triple shows up as
//! ordinary data at the start of the next buffer.  The escaped literal
//! `FF FF` is not special-cased either.  Both are known gaps, kept for
//! compatibility with the behaviour clients of this tunnel already see.
//!
//! # What the filtered view is for
//!
//! The relay writes the *raw* client bytes to the serial device.  The
//! filtered view only feeds logging and traffic counters so negotiation
//! bytes are never mistaken for payload by anything that inspects it.

use std::fmt;

/// The Telnet "Interpret As Command" marker byte.
pub const IAC: u8 = 0xFF;

/// Length of a complete IAC command triple (marker, command, option).
const SEQUENCE_LEN: usize = 3;

/// Returns a copy of `input` with every IAC command triple removed.
///
/// All bytes outside IAC triples are preserved in their original order.
/// A truncated triple at the very end of `input` is dropped.
///
/// # Example
///
/// ```rust
/// use tunnel_core::strip_iac;
///
/// let filtered = strip_iac(&[0x41, 0xFF, 0xFB, 0x01, 0x42]);
/// assert_eq!(filtered, vec![0x41, 0x42]);
/// ```
pub fn strip_iac(input: &[u8]) -> Vec<u8> {
    if !input.contains(&IAC) {
        return input.to_vec();
    }

    let mut filtered = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        if input[i] == IAC {
            i += SEQUENCE_LEN;
        } else {
            filtered.push(input[i]);
            i += 1;
        }
    }
    filtered
}

/// One IAC command found in a buffer.
///
/// `command` and `option` are `None` when the buffer ended before that byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IacCommand {
    /// Offset of the `0xFF` marker within the scanned buffer.
    pub offset: usize,
    pub command: Option<u8>,
    pub option: Option<u8>,
}

impl IacCommand {
    /// `true` when the triple was cut off by the end of the buffer.
    pub fn is_truncated(&self) -> bool {
        self.option.is_none()
    }
}

impl fmt::Display for IacCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.command, self.option) {
            (Some(cmd), Some(opt)) => write!(f, "IAC {} {opt}", command_name(cmd)),
            (Some(cmd), None) => write!(f, "IAC {} <truncated>", command_name(cmd)),
            (None, _) => f.write_str("IAC <truncated>"),
        }
    }
}

/// Iterates over the IAC commands contained in `input`.
///
/// Uses exactly the same scanning rule as [`strip_iac`], so the bytes covered
/// by the yielded commands are precisely the bytes `strip_iac` removes.
pub fn iac_commands(input: &[u8]) -> IacCommands<'_> {
    IacCommands { input, pos: 0 }
}

/// Iterator returned by [`iac_commands`].
#[derive(Debug, Clone)]
pub struct IacCommands<'a> {
    input: &'a [u8],
    pos: usize,
}

impl Iterator for IacCommands<'_> {
    type Item = IacCommand;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.input.len() {
            let offset = self.pos;
            if self.input[offset] == IAC {
                self.pos += SEQUENCE_LEN;
                return Some(IacCommand {
                    offset,
                    command: self.input.get(offset + 1).copied(),
                    option: self.input.get(offset + 2).copied(),
                });
            }
            self.pos += 1;
        }
        None
    }
}

/// Returns the RFC 854 mnemonic for a Telnet command byte.
pub fn command_name(command: u8) -> &'static str {
    match command {
        240 => "SE",
        241 => "NOP",
        242 => "DM",
        243 => "BRK",
        244 => "IP",
        245 => "AO",
        246 => "AYT",
        247 => "EC",
        248 => "EL",
        249 => "GA",
        250 => "SB",
        251 => "WILL",
        252 => "WONT",
        253 => "DO",
        254 => "DONT",
        255 => "IAC",
        _ => "UNKNOWN",
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_iac_removes_single_triple_between_payload() {
        // Arrange
        let input = [0x41, 0xFF, 0xFB, 0x01, 0x42];

        // Act
        let filtered = strip_iac(&input);

        // Assert
        assert_eq!(filtered, vec![0x41, 0x42]);
    }

    #[test]
    fn test_strip_iac_passes_plain_payload_through_unchanged() {
        let input: Vec<u8> = (0u8..=0xFE).collect();
        assert_eq!(strip_iac(&input), input);
    }

    #[test]
    fn test_strip_iac_empty_input_returns_empty() {
        assert!(strip_iac(&[]).is_empty());
    }

    #[test]
    fn test_strip_iac_removes_leading_negotiation() {
        // IAC WILL SUPPRESS-GO-AHEAD followed by one payload byte.
        assert_eq!(strip_iac(&[0xFF, 0xFB, 0x03, 0x06]), vec![0x06]);
    }

    #[test]
    fn test_strip_iac_removes_back_to_back_triples() {
        let input = [0xFF, 0xFD, 0x01, 0xFF, 0xFB, 0x03, 0x10, 0x11];
        assert_eq!(strip_iac(&input), vec![0x10, 0x11]);
    }

    #[test]
    fn test_strip_iac_command_bytes_are_dropped_even_if_they_look_like_data() {
        // The two bytes after the marker are dropped regardless of value.
        assert_eq!(strip_iac(&[0x01, 0xFF, 0x41, 0x42, 0x43]), vec![0x01, 0x43]);
    }

    #[test]
    fn test_strip_iac_truncated_sequence_at_end_is_dropped() {
        // Only one byte follows the marker: both are consumed.
        assert_eq!(strip_iac(&[0x30, 0x31, 0xFF, 0xFD]), vec![0x30, 0x31]);
        // Lone marker at the end.
        assert_eq!(strip_iac(&[0x30, 0xFF]), vec![0x30]);
    }

    #[test]
    fn test_strip_iac_escaped_literal_is_not_special_cased() {
        // FF FF is consumed together with the byte after it.
        assert_eq!(strip_iac(&[0x01, 0xFF, 0xFF, 0x02, 0x03]), vec![0x01, 0x03]);
    }

    #[test]
    fn test_iac_commands_reports_command_and_option() {
        // Arrange
        let input = [0x41, 0xFF, 0xFD, 0x18, 0x42];

        // Act
        let commands: Vec<IacCommand> = iac_commands(&input).collect();

        // Assert
        assert_eq!(
            commands,
            vec![IacCommand {
                offset: 1,
                command: Some(0xFD),
                option: Some(0x18),
            }]
        );
        assert!(!commands[0].is_truncated());
    }

    #[test]
    fn test_iac_commands_reports_truncated_tail() {
        let commands: Vec<IacCommand> = iac_commands(&[0xFF, 0xFB]).collect();
        assert_eq!(commands.len(), 1);
        assert!(commands[0].is_truncated());
        assert_eq!(commands[0].command, Some(0xFB));
    }

    #[test]
    fn test_iac_commands_covers_exactly_the_stripped_bytes() {
        // Arrange
        let input = [0x01, 0xFF, 0xFB, 0x03, 0x02, 0xFF, 0xFE, 0x01, 0x03, 0xFF];

        // Act
        let covered: usize = iac_commands(&input)
            .map(|c| (input.len() - c.offset).min(SEQUENCE_LEN))
            .sum();

        // Assert
        assert_eq!(input.len() - covered, strip_iac(&input).len());
    }

    #[test]
    fn test_command_name_known_negotiation_verbs() {
        assert_eq!(command_name(251), "WILL");
        assert_eq!(command_name(252), "WONT");
        assert_eq!(command_name(253), "DO");
        assert_eq!(command_name(254), "DONT");
        assert_eq!(command_name(250), "SB");
    }

    #[test]
    fn test_command_name_unknown_byte() {
        assert_eq!(command_name(0x41), "UNKNOWN");
    }

    #[test]
    fn test_iac_command_display_formats_mnemonic() {
        let complete = IacCommand {
            offset: 0,
            command: Some(253),
            option: Some(3),
        };
        let truncated = IacCommand {
            offset: 0,
            command: None,
            option: None,
        };
        assert_eq!(complete.to_string(), "IAC DO 3");
        assert_eq!(truncated.to_string(), "IAC <truncated>");
    }
}
