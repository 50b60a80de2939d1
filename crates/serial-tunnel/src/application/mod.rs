//! Application layer for serial-tunnel.
//!
//! Decides *what* happens to the bytes that flow through a session without
//! doing any I/O itself:
//!
//! - Splitting each client chunk into its raw (device-bound) and filtered
//!   (observed) views
//! - Counting traffic per direction
//!
//! Sockets, the serial driver and task spawning live in the infrastructure
//! layer.

pub mod inbound;
pub mod traffic;

pub use inbound::{hex_preview, InboundChunk};
pub use traffic::TrafficStats;
