//! Domain layer for serial-tunnel.
//!
//! Plain data types with no I/O: the runtime configuration and the vocabulary
//! used to describe how a relay session ended.  Nothing here touches sockets,
//! serial drivers, or the async runtime.

pub mod config;
pub mod session;

pub use config::TunnelConfig;
pub use session::{SessionReport, TeardownReason, TrafficSnapshot};
