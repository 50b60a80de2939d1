//! Optional TOML configuration file.
//!
//! Every table and every field may be omitted; missing values take the same
//! defaults as [`TunnelConfig::default`].  Command-line flags are applied on
//! top of the result in `main.rs`.
//!
//! ```toml
//! [serial]
//! device = "/dev/ttyUSB0"
//! baud_rate = 115200
//!
//! [tcp]
//! bind = "0.0.0.0"
//! port = 5558
//!
//! [relay]
//! poll_interval_ms = 1
//! accept_timeout_ms = 1000
//! recv_buffer_size = 4096
//! tcp_nodelay = true
//! drain_timeout_ms = 2000
//!
//! [logging]
//! log_level = "info"
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::config::{
    default_serial_device, DEFAULT_BAUD_RATE, DEFAULT_RECV_BUFFER_SIZE, DEFAULT_TCP_PORT,
    MIN_TCP_PORT,
};
use crate::domain::TunnelConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// `[tcp] bind` is not an IP address.
    #[error("invalid bind address in config: '{0}'")]
    InvalidBind(String),

    /// `[tcp] port` is in the privileged range.
    #[error("TCP port {0} is out of range (1024-65535)")]
    PortOutOfRange(u16),
}

// ── Config schema types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub serial: SerialSection,
    pub tcp: TcpSection,
    pub relay: RelaySection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SerialSection {
    #[serde(default = "default_device")]
    pub device: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TcpSection {
    /// IP address to listen on.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RelaySection {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_accept_timeout_ms")]
    pub accept_timeout_ms: u64,
    #[serde(default = "default_recv_buffer_size")]
    pub recv_buffer_size: usize,
    #[serde(default = "default_true")]
    pub tcp_nodelay: bool,
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// `tracing` filter directive, e.g. `"info"` or `"serial_tunnel=debug"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_device() -> String {
    default_serial_device().to_string()
}
fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}
fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    DEFAULT_TCP_PORT
}
fn default_poll_interval_ms() -> u64 {
    1
}
fn default_accept_timeout_ms() -> u64 {
    1000
}
fn default_recv_buffer_size() -> usize {
    DEFAULT_RECV_BUFFER_SIZE
}
fn default_true() -> bool {
    true
}
fn default_drain_timeout_ms() -> u64 {
    2000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SerialSection {
    fn default() -> Self {
        Self {
            device: default_device(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for TcpSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            accept_timeout_ms: default_accept_timeout_ms(),
            recv_buffer_size: default_recv_buffer_size(),
            tcp_nodelay: default_true(),
            drain_timeout_ms: default_drain_timeout_ms(),
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl FileConfig {
    /// Builds the runtime configuration described by this file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBind`] or [`ConfigError::PortOutOfRange`]
    /// for values TOML itself cannot reject.
    pub fn to_tunnel_config(&self) -> Result<TunnelConfig, ConfigError> {
        let ip: IpAddr = self
            .tcp
            .bind
            .parse()
            .map_err(|_| ConfigError::InvalidBind(self.tcp.bind.clone()))?;
        if self.tcp.port < MIN_TCP_PORT {
            return Err(ConfigError::PortOutOfRange(self.tcp.port));
        }

        Ok(TunnelConfig {
            serial_device: self.serial.device.clone(),
            baud_rate: self.serial.baud_rate,
            bind_addr: SocketAddr::new(ip, self.tcp.port),
            accept_timeout: Duration::from_millis(self.relay.accept_timeout_ms),
            serial_poll_interval: Duration::from_millis(self.relay.poll_interval_ms),
            recv_buffer_size: self.relay.recv_buffer_size.max(1),
            tcp_nodelay: self.relay.tcp_nodelay,
            drain_timeout: Duration::from_millis(self.relay.drain_timeout_ms),
            ..TunnelConfig::default()
        })
    }
}

/// Parses configuration from TOML text.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if the TOML is malformed or names an
/// unknown field.
pub fn parse_config(content: &str) -> Result<FileConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Loads the configuration file at `path`.
///
/// There is no implicit location; a missing file is an error.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read and
/// [`ConfigError::Parse`] if its content is invalid.
pub fn load_config_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_matches_built_in_defaults() {
        // Arrange / Act
        let file = parse_config("").unwrap();
        let config = file.to_tunnel_config().unwrap();

        // Assert
        assert_eq!(config, TunnelConfig::default());
        assert_eq!(file.logging.log_level, "info");
    }

    #[test]
    fn test_partial_table_keeps_other_defaults() {
        let file = parse_config("[serial]\ndevice = \"/dev/ttyACM1\"\n").unwrap();

        assert_eq!(file.serial.device, "/dev/ttyACM1");
        assert_eq!(file.serial.baud_rate, 115_200);
        assert_eq!(file.tcp.port, 5558);
    }

    #[test]
    fn test_full_file_is_applied() {
        // Arrange
        let text = r#"
            [serial]
            device = "COM7"
            baud_rate = 9600

            [tcp]
            bind = "127.0.0.1"
            port = 6000

            [relay]
            poll_interval_ms = 5
            accept_timeout_ms = 250
            recv_buffer_size = 512
            tcp_nodelay = false
            drain_timeout_ms = 100

            [logging]
            log_level = "debug"
        "#;

        // Act
        let file = parse_config(text).unwrap();
        let config = file.to_tunnel_config().unwrap();

        // Assert
        assert_eq!(config.serial_device, "COM7");
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.bind_addr, "127.0.0.1:6000".parse().unwrap());
        assert_eq!(config.serial_poll_interval, Duration::from_millis(5));
        assert_eq!(config.accept_timeout, Duration::from_millis(250));
        assert_eq!(config.recv_buffer_size, 512);
        assert!(!config.tcp_nodelay);
        assert_eq!(config.drain_timeout, Duration::from_millis(100));
        assert_eq!(file.logging.log_level, "debug");
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let result = parse_config("[tcp]\nprot = 6000\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_privileged_port_is_rejected() {
        let file = parse_config("[tcp]\nport = 23\n").unwrap();
        assert!(matches!(
            file.to_tunnel_config(),
            Err(ConfigError::PortOutOfRange(23))
        ));
    }

    #[test]
    fn test_invalid_bind_is_rejected() {
        let file = parse_config("[tcp]\nbind = \"localhost\"\n").unwrap();
        assert!(matches!(
            file.to_tunnel_config(),
            Err(ConfigError::InvalidBind(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error_naming_path() {
        // Arrange
        let path = std::env::temp_dir().join("serial-tunnel-does-not-exist.toml");

        // Act
        let err = load_config_file(&path).unwrap_err();

        // Assert
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("serial-tunnel-does-not-exist.toml"));
    }

    #[test]
    fn test_load_config_file_reads_from_disk() {
        let path = std::env::temp_dir().join(format!(
            "serial-tunnel-config-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[tcp]\nport = 7001\n").unwrap();

        let file = load_config_file(&path);
        let _ = std::fs::remove_file(&path);

        assert_eq!(file.unwrap().tcp.port, 7001);
    }
}
