//! Shared state of one running tunnel.
//!
//! Built once at startup and handed to the listener and every session behind
//! an `Arc`.  There are no process globals: two tunnels in the same process
//! (as in the integration tests) each have their own context.

use std::sync::Arc;

use tunnel_core::ConnectionSlot;

use crate::domain::TunnelConfig;
use crate::infrastructure::serial::SerialHandle;
use crate::infrastructure::shutdown::StopSignal;

#[derive(Debug)]
pub struct TunnelContext {
    pub config: TunnelConfig,
    /// The open device, shared by whichever session holds the slot.
    pub serial: SerialHandle,
    /// Single-client guard consulted by the listener.
    pub slot: ConnectionSlot,
    pub stop: StopSignal,
}

impl TunnelContext {
    pub fn new(config: TunnelConfig, serial: SerialHandle, stop: StopSignal) -> Arc<Self> {
        Arc::new(Self {
            config,
            serial,
            slot: ConnectionSlot::new(),
            stop,
        })
    }
}
