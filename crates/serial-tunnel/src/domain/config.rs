//! Tunnel configuration types.
//!
//! [`TunnelConfig`] is the single source of truth for all runtime settings.
//! `main.rs` builds it from CLI arguments layered over an optional TOML file;
//! tests build it directly with [`TunnelConfig::new`] and tweak fields.
//!
//! Keeping it a plain struct (no globals, no environment reads here) means the
//! relay can be started several times in one test process with different
//! settings.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// TCP port clients connect to unless configured otherwise.
pub const DEFAULT_TCP_PORT: u16 = 5558;

/// Lowest TCP port an operator may choose (the privileged range is refused).
pub const MIN_TCP_PORT: u16 = 1024;

/// Baud rate used to open the serial device.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Size of each TCP receive in the client→device pump.
pub const DEFAULT_RECV_BUFFER_SIZE: usize = 4096;

/// All runtime configuration for the tunnel.
#[derive(Debug, Clone, PartialEq)]
pub struct TunnelConfig {
    /// Serial device identifier, e.g. `/dev/ttyUSB0` or `COM3`.
    pub serial_device: String,

    /// Baud rate; the line is always 8 data bits, no parity, 1 stop bit.
    pub baud_rate: u32,

    /// Driver timeout of the serial device.  Reads only ever ask for bytes
    /// the driver already holds, so in practice this bounds writes.
    pub serial_write_timeout: Duration,

    /// Address the TCP listener binds to.  `0.0.0.0` accepts clients on every
    /// interface.
    pub bind_addr: SocketAddr,

    /// Upper bound on a single `accept()` wait.  The listener re-checks the
    /// stop signal at least this often.
    pub accept_timeout: Duration,

    /// Idle sleep of the device→client pump when the serial device has no
    /// bytes buffered.  Also bounds how quickly that pump notices a teardown.
    pub serial_poll_interval: Duration,

    /// Maximum bytes taken from the TCP client per read.
    pub recv_buffer_size: usize,

    /// Disable Nagle's algorithm on accepted connections so small device
    /// responses are not delayed.
    pub tcp_nodelay: bool,

    /// How long shutdown waits for the active session to finish before the
    /// serial device is closed anyway.
    pub drain_timeout: Duration,
}

impl TunnelConfig {
    /// Creates a configuration for `serial_device` served on `tcp_port` on all
    /// interfaces, with every other field at its default.
    ///
    /// # Example
    ///
    /// ```rust
    /// use serial_tunnel::domain::TunnelConfig;
    ///
    /// let cfg = TunnelConfig::new("/dev/ttyACM0", 6000);
    /// assert_eq!(cfg.bind_addr.port(), 6000);
    /// assert_eq!(cfg.baud_rate, 115_200);
    /// ```
    pub fn new(serial_device: impl Into<String>, tcp_port: u16) -> Self {
        Self {
            serial_device: serial_device.into(),
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), tcp_port),
            ..Self::default()
        }
    }
}

impl Default for TunnelConfig {
    /// | Field                | Default              |
    /// |----------------------|----------------------|
    /// | serial_device        | platform first port  |
    /// | baud_rate            | 115200               |
    /// | serial_write_timeout | 1 second             |
    /// | bind_addr            | `0.0.0.0:5558`       |
    /// | accept_timeout       | 1 second             |
    /// | serial_poll_interval | 1 millisecond        |
    /// | recv_buffer_size     | 4096                 |
    /// | tcp_nodelay          | true                 |
    /// | drain_timeout        | 2 seconds            |
    fn default() -> Self {
        Self {
            serial_device: default_serial_device().to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            serial_write_timeout: Duration::from_secs(1),
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_TCP_PORT),
            accept_timeout: Duration::from_secs(1),
            serial_poll_interval: Duration::from_millis(1),
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
            tcp_nodelay: true,
            drain_timeout: Duration::from_secs(2),
        }
    }
}

/// The device name most USB-serial adapters get on this platform.
pub fn default_serial_device() -> &'static str {
    if cfg!(target_os = "windows") {
        "COM1"
    } else if cfg!(target_os = "macos") {
        "/dev/cu.usbserial"
    } else {
        "/dev/ttyUSB0"
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
