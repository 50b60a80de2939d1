//! # tunnel-core
//!
//! Shared building blocks for the serial-tunnel relay that have no
//! dependency on sockets, serial drivers, or an async runtime.
//!
//! - **`telnet`** – Recognises Telnet IAC (Interpret-As-Command) sequences
//!   that some TCP clients (PuTTY, `telnet`, terminal emulators) inject into
//!   the byte stream, and produces a filtered view with them removed.
//!
//! - **`domain`** – The [`ConnectionSlot`], a single-occupancy guard that
//!   enforces the one-client-at-a-time policy of the relay.
//!
//! Everything here is synchronous and side-effect free apart from logging,
//! which keeps it trivially testable and benchmarkable.

pub mod domain;
pub mod telnet;

// Re-export the most-used items at the crate root so callers can write
// `tunnel_core::strip_iac` instead of `tunnel_core::telnet::iac::strip_iac`.
pub use domain::slot::{ConnectionSlot, SlotOccupant};
pub use telnet::iac::{command_name, iac_commands, strip_iac, IacCommand, IAC};
