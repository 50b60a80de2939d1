//! Client→device chunk handling.
//!
//! Each TCP read becomes an [`InboundChunk`].  The chunk carries two views of
//! the same bytes:
//!
//! - [`InboundChunk::raw`] – exactly what the client sent.  **This** is what
//!   the relay writes to the serial device, Telnet negotiation included.
//! - [`InboundChunk::filtered`] – the same bytes with IAC triples removed.
//!   Only logging and traffic counters look at this view.
//!
//! Keeping the two apart is what lets a device that happens to use `0xFF` in
//! its own protocol keep working behind a Telnet-speaking client, while the
//! logs still show what the operator actually typed.

use std::fmt::Write as _;

use tunnel_core::telnet::iac::IacCommands;
use tunnel_core::{iac_commands, strip_iac};

/// One TCP read from the client, with its filtered view precomputed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundChunk<'a> {
    raw: &'a [u8],
    filtered: Vec<u8>,
}

impl<'a> InboundChunk<'a> {
    pub fn new(raw: &'a [u8]) -> Self {
        Self {
            raw,
            filtered: strip_iac(raw),
        }
    }

    /// The unmodified client bytes, destined for the serial device.
    pub fn raw(&self) -> &'a [u8] {
        self.raw
    }

    /// The client bytes without IAC triples.  Observation only.
    pub fn filtered(&self) -> &[u8] {
        &self.filtered
    }

    /// Number of raw bytes that belonged to IAC triples.
    pub fn iac_len(&self) -> usize {
        self.raw.len() - self.filtered.len()
    }

    pub fn has_commands(&self) -> bool {
        self.iac_len() > 0
    }

    /// The IAC commands contained in the raw bytes.
    pub fn commands(&self) -> IacCommands<'a> {
        iac_commands(self.raw)
    }
}

/// Formats up to `max` bytes as space-separated hex, with a `…` suffix when
/// the input is longer.
pub fn hex_preview(bytes: &[u8], max: usize) -> String {
    let mut out = String::with_capacity(bytes.len().min(max) * 3 + 1);
    for (i, byte) in bytes.iter().take(max).enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{byte:02X}");
    }
    if bytes.len() > max {
        out.push('…');
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
