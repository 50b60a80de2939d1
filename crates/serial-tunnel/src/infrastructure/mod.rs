//! Infrastructure layer for serial-tunnel.
//!
//! Handles all I/O: the serial driver, the TCP listener, per-session tasks and
//! the stop signal.
//!
//! # Responsibilities
//!
//! - Opening the serial device and enumerating ports
//! - Binding the TCP listener and enforcing the single-client slot
//! - Spawning one relay session (two pump tasks) per admitted client
//! - Reading the optional TOML configuration file
//! - Shutting everything down in order when the stop signal is raised

pub mod config_file;
pub mod context;
pub mod error;
pub mod listener;
pub mod relay_session;
pub mod serial;
pub mod shutdown;

use std::sync::Arc;

use tracing::info;

pub use context::TunnelContext;
pub use error::TunnelError;
pub use listener::TunnelListener;
pub use serial::{list_ports, open_serial, SerialHandle};
pub use shutdown::{spawn_ctrl_c_handler, StopSignal};

use crate::domain::TunnelConfig;

/// Opens the serial device and relays it over TCP until `stop` is raised.
///
/// Startup order is serial first, then the listener; teardown is the reverse,
/// so the device is closed only after the listener and its session are gone.
///
/// # Errors
///
/// Returns [`TunnelError::SerialOpen`] or [`TunnelError::Bind`] if startup
/// fails, or [`TunnelError::Accept`] if the listener breaks at runtime (in
/// which case `stop` has been raised).
pub async fn run_tunnel(config: TunnelConfig, stop: StopSignal) -> Result<(), TunnelError> {
    let serial = open_serial(&config)?;
    serve(config, serial, stop).await
}

/// Like [`run_tunnel`], for a device that is already open.
///
/// # Errors
///
/// Returns [`TunnelError::Bind`] or [`TunnelError::Accept`].
pub async fn serve(
    config: TunnelConfig,
    serial: SerialHandle,
    stop: StopSignal,
) -> Result<(), TunnelError> {
    let listener = TunnelListener::bind(config.bind_addr).await?;
    let ctx = TunnelContext::new(config, serial, stop);

    let result = listener.run(Arc::clone(&ctx)).await;

    info!("closing serial device {}", ctx.serial.name());
    result
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::serial::FakeSerialDevice;
    use std::time::Duration;

    #[tokio::test]
    async fn test_run_tunnel_with_missing_device_fails_before_binding() {
        // Arrange
        let config = TunnelConfig::new("/dev/serial-tunnel-no-such-device", 0);

        // Act
        let result = run_tunnel(config, StopSignal::new()).await;

        // Assert
        assert!(matches!(result, Err(TunnelError::SerialOpen { .. })));
    }

    #[tokio::test]
    async fn test_serve_stops_on_signal() {
        // Arrange
        let mut config = TunnelConfig::new("fake", 0);
        config.bind_addr = "127.0.0.1:0".parse().unwrap();
        config.accept_timeout = Duration::from_millis(20);
        let stop = StopSignal::new();
        let task = tokio::spawn(serve(config, FakeSerialDevice::new().handle(), stop.clone()));

        // Act
        tokio::time::sleep(Duration::from_millis(30)).await;
        stop.trigger();

        // Assert
        let result = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("serve must return after stop")
            .unwrap();
        assert!(result.is_ok());
    }
}
