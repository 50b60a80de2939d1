//! serial-tunnel: entry point.
//!
//! Opens a serial device and relays it to a single TCP client.
//!
//! # Usage
//!
//! ```text
//! serial-tunnel [OPTIONS]
//!
//! Options:
//!   -d, --device <DEVICE>          Serial device [default: platform first port]
//!   -p, --port <PORT>              TCP port, 1024-65535 [default: 5558]
//!       --bind <IP>                Listen address [default: 0.0.0.0]
//!       --baud <BAUD>              Baud rate [default: 115200]
//!   -c, --config <FILE>            TOML configuration file
//!       --poll-interval-ms <MS>    Idle serial poll interval [default: 1]
//!       --accept-timeout-ms <MS>   Upper bound on one accept wait [default: 1000]
//!       --list-ports               Print the serial ports of this machine and exit
//! ```
//!
//! # Precedence
//!
//! Command-line flags (or their environment variables) override the config
//! file, which overrides the built-in defaults.
//!
//! | Variable                          | Flag                  |
//! |-----------------------------------|-----------------------|
//! | `SERIAL_TUNNEL_DEVICE`            | `--device`            |
//! | `SERIAL_TUNNEL_PORT`              | `--port`              |
//! | `SERIAL_TUNNEL_BIND`              | `--bind`              |
//! | `SERIAL_TUNNEL_BAUD`              | `--baud`              |
//! | `SERIAL_TUNNEL_CONFIG`            | `--config`            |
//! | `SERIAL_TUNNEL_POLL_INTERVAL_MS`  | `--poll-interval-ms`  |
//! | `SERIAL_TUNNEL_ACCEPT_TIMEOUT_MS` | `--accept-timeout-ms` |
//!
//! The log level comes from `RUST_LOG`, then `[logging] log_level` in the
//! config file, then `info`.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use serial_tunnel::domain::TunnelConfig;
use serial_tunnel::infrastructure::config_file::{load_config_file, FileConfig};
use serial_tunnel::infrastructure::{list_ports, run_tunnel, spawn_ctrl_c_handler, StopSignal};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Relays a serial device to a single TCP client.
///
/// Unset flags fall through to the config file.
#[derive(Debug, Parser)]
#[command(
    name = "serial-tunnel",
    about = "Serial-to-TCP tunnel for a single client",
    version
)]
struct Cli {
    /// Serial device to open, e.g. `/dev/ttyUSB0` or `COM3`.
    #[arg(short, long, env = "SERIAL_TUNNEL_DEVICE")]
    device: Option<String>,

    /// TCP port to listen on (1024-65535).
    #[arg(
        short,
        long,
        env = "SERIAL_TUNNEL_PORT",
        value_parser = clap::value_parser!(u16).range(1024..)
    )]
    port: Option<u16>,

    /// IP address to listen on.  `0.0.0.0` accepts clients on every interface.
    #[arg(long, env = "SERIAL_TUNNEL_BIND")]
    bind: Option<String>,

    /// Baud rate of the serial line (always 8N1, no flow control).
    #[arg(long, env = "SERIAL_TUNNEL_BAUD")]
    baud: Option<u32>,

    /// TOML configuration file.
    #[arg(short, long, env = "SERIAL_TUNNEL_CONFIG")]
    config: Option<PathBuf>,

    /// Sleep between serial polls while the device is idle, in milliseconds.
    #[arg(long, env = "SERIAL_TUNNEL_POLL_INTERVAL_MS")]
    poll_interval_ms: Option<u64>,

    /// Upper bound on a single accept wait, in milliseconds.
    #[arg(long, env = "SERIAL_TUNNEL_ACCEPT_TIMEOUT_MS")]
    accept_timeout_ms: Option<u64>,

    /// Print the serial ports of this machine and exit.
    #[arg(long)]
    list_ports: bool,
}

impl Cli {
    /// Layers the CLI arguments over `file` (or the built-in defaults).
    ///
    /// # Errors
    ///
    /// Returns an error if the config file holds invalid values or `--bind`
    /// is not an IP address.
    fn into_tunnel_config(self, file: Option<&FileConfig>) -> anyhow::Result<TunnelConfig> {
        let mut config = match file {
            Some(file) => file
                .to_tunnel_config()
                .context("invalid configuration file")?,
            None => TunnelConfig::default(),
        };

        if let Some(device) = self.device {
            config.serial_device = device;
        }
        if let Some(baud) = self.baud {
            config.baud_rate = baud;
        }

        let ip = match self.bind.as_deref() {
            Some(bind) => bind
                .parse::<IpAddr>()
                .with_context(|| format!("invalid bind address: '{bind}'"))?,
            None => config.bind_addr.ip(),
        };
        let port = self.port.unwrap_or(config.bind_addr.port());
        config.bind_addr = SocketAddr::new(ip, port);

        if let Some(ms) = self.poll_interval_ms {
            config.serial_poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = self.accept_timeout_ms {
            config.accept_timeout = Duration::from_millis(ms);
        }

        Ok(config)
    }
}

fn print_ports() -> anyhow::Result<()> {
    let ports = list_ports().context("could not list serial ports")?;
    if ports.is_empty() {
        println!("no serial ports found");
        return Ok(());
    }
    for (index, port) in ports.iter().enumerate() {
        println!("{:>3}  {:<24} {}", index + 1, port.name, port.description);
    }
    Ok(())
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let file = cli
        .config
        .as_deref()
        .map(load_config_file)
        .transpose()
        .context("failed to load configuration file")?;

    // ── Logging setup ─────────────────────────────────────────────────────────
    let log_level = file
        .as_ref()
        .map_or("info", |file| file.logging.log_level.as_str());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .init();

    if cli.list_ports {
        return print_ports();
    }

    let config = cli.into_tunnel_config(file.as_ref())?;

    info!(
        "serial-tunnel starting: device={} baud={} listen={}",
        config.serial_device, config.baud_rate, config.bind_addr
    );

    // ── Graceful shutdown ──────────────────────────────────────────────────────
    let stop = StopSignal::new();
    spawn_ctrl_c_handler(stop.clone());

    run_tunnel(config, stop)
        .await
        .context("serial tunnel stopped with an error")?;

    info!("serial-tunnel stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serial_tunnel::infrastructure::config_file::parse_config;

    #[test]
    fn test_cli_without_arguments_sets_nothing() {
        // Arrange / Act
        let cli = Cli::parse_from(["serial-tunnel"]);

        // Assert
        assert!(cli.port.is_none());
        assert!(cli.config.is_none());
        assert!(!cli.list_ports);
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["serial-tunnel", "-d", "/dev/ttyACM0", "-p", "6000"]);
        assert_eq!(cli.device.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(cli.port, Some(6000));
    }

    #[test]
    fn test_cli_rejects_privileged_port() {
        let result = Cli::try_parse_from(["serial-tunnel", "--port", "23"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_accepts_lowest_unprivileged_port() {
        let cli = Cli::parse_from(["serial-tunnel", "--port", "1024"]);
        assert_eq!(cli.port, Some(1024));
    }

    #[test]
    fn test_cli_list_ports_flag() {
        let cli = Cli::parse_from(["serial-tunnel", "--list-ports"]);
        assert!(cli.list_ports);
    }

    #[test]
    fn test_into_tunnel_config_defaults() {
        // Arrange
        let cli = Cli::parse_from(["serial-tunnel"]);

        // Act
        let config = cli.into_tunnel_config(None).unwrap();

        // Assert
        assert_eq!(config.bind_addr.port(), 5558);
        assert_eq!(config.baud_rate, 115_200);
    }

    #[test]
    fn test_into_tunnel_config_applies_flags() {
        let cli = Cli::parse_from([
            "serial-tunnel",
            "--device",
            "COM4",
            "--bind",
            "127.0.0.1",
            "--port",
            "7000",
            "--baud",
            "9600",
            "--poll-interval-ms",
            "5",
            "--accept-timeout-ms",
            "250",
        ]);

        let config = cli.into_tunnel_config(None).unwrap();

        assert_eq!(config.serial_device, "COM4");
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:7000");
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.serial_poll_interval, Duration::from_millis(5));
        assert_eq!(config.accept_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_cli_overrides_file_and_file_overrides_defaults() {
        // Arrange: the file sets device and port; the CLI overrides only the port.
        let file = parse_config("[serial]\ndevice = \"/dev/ttyS1\"\n[tcp]\nport = 6001\n").unwrap();
        let cli = Cli::parse_from(["serial-tunnel", "--port", "6002"]);

        // Act
        let config = cli.into_tunnel_config(Some(&file)).unwrap();

        // Assert
        assert_eq!(config.serial_device, "/dev/ttyS1");
        assert_eq!(config.bind_addr.port(), 6002);
    }

    #[test]
    fn test_into_tunnel_config_invalid_bind_returns_error() {
        let cli = Cli::parse_from(["serial-tunnel", "--bind", "not.an.ip"]);
        assert!(cli.into_tunnel_config(None).is_err());
    }

    #[test]
    fn test_into_tunnel_config_invalid_file_returns_error() {
        let file = parse_config("[tcp]\nport = 80\n").unwrap();
        let cli = Cli::parse_from(["serial-tunnel"]);
        assert!(cli.into_tunnel_config(Some(&file)).is_err());
    }
}
