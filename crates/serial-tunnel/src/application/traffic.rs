//! Per-session traffic counters.
//!
//! Both pumps update the same [`TrafficStats`] from different tasks, so the
//! counters are atomics.  `Relaxed` is sufficient: each counter is read only
//! for reporting, after the pumps have been joined.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::application::inbound::InboundChunk;
use crate::domain::TrafficSnapshot;

#[derive(Debug, Default)]
pub struct TrafficStats {
    serial_to_tcp: AtomicU64,
    tcp_to_serial: AtomicU64,
    iac: AtomicU64,
}

impl TrafficStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records device output delivered to the client.
    pub fn record_serial_to_tcp(&self, len: usize) {
        self.serial_to_tcp.fetch_add(len as u64, Ordering::Relaxed);
    }

    /// Records a client chunk written to the device.
    pub fn record_tcp_to_serial(&self, chunk: &InboundChunk<'_>) {
        self.tcp_to_serial
            .fetch_add(chunk.raw().len() as u64, Ordering::Relaxed);
        self.iac.fetch_add(chunk.iac_len() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TrafficSnapshot {
        TrafficSnapshot {
            serial_to_tcp_bytes: self.serial_to_tcp.load(Ordering::Relaxed),
            tcp_to_serial_bytes: self.tcp_to_serial.load(Ordering::Relaxed),
            iac_bytes: self.iac.load(Ordering::Relaxed),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stats_are_zero() {
        assert_eq!(TrafficStats::new().snapshot(), TrafficSnapshot::default());
    }

    #[test]
    fn test_records_accumulate_per_direction() {
        // Arrange
        let stats = TrafficStats::new();
        let negotiation = [0xFF, 0xFB, 0x03, 0x06];
        let plain = [0x01, 0x02];

        // Act
        stats.record_serial_to_tcp(3);
        stats.record_serial_to_tcp(2);
        stats.record_tcp_to_serial(&InboundChunk::new(&negotiation));
        stats.record_tcp_to_serial(&InboundChunk::new(&plain));

        // Assert
        let snap = stats.snapshot();
        assert_eq!(snap.serial_to_tcp_bytes, 5);
        assert_eq!(snap.tcp_to_serial_bytes, 6, "raw bytes are counted");
        assert_eq!(snap.iac_bytes, 3);
    }
}
