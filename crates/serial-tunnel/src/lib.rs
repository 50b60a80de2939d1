//! serial-tunnel library crate.
//!
//! Exposes one serial device to exactly one TCP client at a time.  Bytes from
//! the device go to the client unchanged; bytes from the client go to the
//! device unchanged.  Telnet negotiation (IAC sequences) that terminal clients
//! inject is recognised and kept out of the logged view of the stream.
//!
//! # Architecture
//!
//! ```text
//! TCP client (PuTTY, telnet, nc, …)
//!         ↕  raw bytes
//! [serial-tunnel]
//!   ├── domain/           TunnelConfig, TeardownReason, SessionReport
//!   ├── application/      Raw/filtered chunk views, traffic counters
//!   └── infrastructure/
//!         ├── listener/       Accept loop + single-client slot
//!         ├── relay_session/  Two pumps and their shared teardown
//!         ├── serial/         serialport backend and an in-memory fake
//!         ├── config_file/    Optional TOML settings
//!         └── shutdown/       Process-wide stop signal
//!         ↕
//! Serial device (8N1, no flow control)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `tunnel-core` only.
//! - `infrastructure` depends on all other layers plus `tokio` and `serialport`.

/// Domain layer: configuration and session outcome types.
pub mod domain;

/// Application layer: what happens to relayed bytes.
pub mod application;

/// Infrastructure layer: serial driver, TCP listener, sessions.
pub mod infrastructure;
