//! Errors surfaced to the top level.
//!
//! Only startup failures and a broken listener ever leave the relay as an
//! error.  Everything that goes wrong inside a session is turned into a
//! [`TeardownReason`](crate::domain::TeardownReason) and stays there.

use std::net::SocketAddr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TunnelError {
    /// The serial device could not be opened (missing, busy, no permission).
    #[error("failed to open serial device {device}: {source}")]
    SerialOpen {
        device: String,
        #[source]
        source: serialport::Error,
    },

    /// The serial ports of this machine could not be listed.
    #[error("failed to enumerate serial ports: {0}")]
    PortEnumeration(#[source] serialport::Error),

    /// The TCP listener could not bind (port in use, no permission).
    #[error("failed to bind TCP listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The listening socket failed outside of a shutdown.
    #[error("TCP listener failed: {0}")]
    Accept(#[source] std::io::Error),
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_error_message_names_address() {
        let err = TunnelError::Bind {
            addr: "0.0.0.0:5558".parse().unwrap(),
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"),
        };
        assert_eq!(
            err.to_string(),
            "failed to bind TCP listener on 0.0.0.0:5558: in use"
        );
    }

    #[test]
    fn test_serial_open_error_message_names_device() {
        let err = TunnelError::SerialOpen {
            device: "/dev/ttyUSB9".to_string(),
            source: serialport::Error::new(serialport::ErrorKind::NoDevice, "not found"),
        };
        assert!(err.to_string().contains("/dev/ttyUSB9"));
    }
}
