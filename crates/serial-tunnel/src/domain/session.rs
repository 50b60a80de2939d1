//! Session outcome types.
//!
//! A relay session always ends for exactly one recorded reason: the first
//! failure observed by either pump, or a process-wide shutdown.  The
//! [`SessionReport`] summarises the session once both pumps have exited.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use uuid::Uuid;

/// Why a session was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownReason {
    /// The TCP client closed its side (zero-length read).
    PeerClosed,
    /// Reading from the TCP client failed.
    TcpReadFailed,
    /// Writing device output to the TCP client failed.
    TcpWriteFailed,
    /// Polling or reading the serial device failed.
    SerialReadFailed,
    /// Writing client bytes to the serial device failed.
    SerialWriteFailed,
    /// The process-wide stop signal was raised.
    Shutdown,
}

impl TeardownReason {
    /// `true` for reasons that indicate an I/O failure rather than an orderly
    /// end of the session.
    pub fn is_failure(self) -> bool {
        !matches!(self, Self::PeerClosed | Self::Shutdown)
    }
}

impl fmt::Display for TeardownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::PeerClosed => "client disconnected",
            Self::TcpReadFailed => "TCP read failed",
            Self::TcpWriteFailed => "TCP write failed",
            Self::SerialReadFailed => "serial read failed",
            Self::SerialWriteFailed => "serial write failed",
            Self::Shutdown => "tunnel shutting down",
        };
        f.write_str(text)
    }
}

/// Byte counters for one session at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrafficSnapshot {
    /// Bytes read from the device and delivered to the client.
    pub serial_to_tcp_bytes: u64,
    /// Raw bytes received from the client and written to the device.
    pub tcp_to_serial_bytes: u64,
    /// Bytes of the client stream that belonged to IAC command triples.
    pub iac_bytes: u64,
}

/// Summary logged when a session ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub peer: SocketAddr,
    pub reason: TeardownReason,
    pub duration: Duration,
    pub traffic: TrafficSnapshot,
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "session {} ({}) ended after {:.1}s: {}; serial→tcp {} B, tcp→serial {} B, iac {} B",
            self.session_id,
            self.peer,
            self.duration.as_secs_f64(),
            self.reason,
            self.traffic.serial_to_tcp_bytes,
            self.traffic.tcp_to_serial_bytes,
            self.traffic.iac_bytes,
        )
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
