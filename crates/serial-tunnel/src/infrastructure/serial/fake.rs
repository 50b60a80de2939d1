//! In-memory serial device for tests.
//!
//! Lets tests play the role of the hardware: queue bytes the "device"
//! produces, inspect what the relay wrote to it, and inject driver failures,
//! all without a real port.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{SerialDevice, SerialHandle};

#[derive(Debug, Default)]
struct FakeState {
    /// Bytes the device has produced and the relay has not read yet.
    pending: VecDeque<u8>,
    /// Every byte the relay wrote, in order.
    written: Vec<u8>,
    read_error: Option<io::ErrorKind>,
    write_error: Option<io::ErrorKind>,
    polls: u64,
}

/// A scriptable [`SerialDevice`].
///
/// Clones share the same state, so a test keeps one clone for scripting and
/// hands [`FakeSerialDevice::handle`] to the relay.
#[derive(Debug, Clone, Default)]
pub struct FakeSerialDevice {
    state: Arc<Mutex<FakeState>>,
}

impl FakeSerialDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// A [`SerialHandle`] whose reader and writer both drive this fake.
    pub fn handle(&self) -> SerialHandle {
        SerialHandle::new("fake", Box::new(self.clone()), Box::new(self.clone()))
    }

    /// Makes `bytes` available for the relay to read, as if the device had
    /// just transmitted them.
    pub fn push_output(&self, bytes: &[u8]) {
        self.lock().pending.extend(bytes.iter().copied());
    }

    /// Everything written to the device so far.
    pub fn written(&self) -> Vec<u8> {
        self.lock().written.clone()
    }

    /// Bytes produced by the device but not read by the relay yet.
    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Every subsequent poll or read fails with `kind`.
    pub fn fail_reads(&self, kind: io::ErrorKind) {
        self.lock().read_error = Some(kind);
    }

    /// Every subsequent write fails with `kind`.
    pub fn fail_writes(&self, kind: io::ErrorKind) {
        self.lock().write_error = Some(kind);
    }

    pub fn clear_failures(&self) {
        let mut state = self.lock();
        state.read_error = None;
        state.write_error = None;
    }

    /// How many times the relay asked for pending bytes.
    pub fn poll_count(&self) -> u64 {
        self.lock().polls
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SerialDevice for FakeSerialDevice {
    fn bytes_to_read(&mut self) -> io::Result<u32> {
        let mut state = self.lock();
        state.polls += 1;
        if let Some(kind) = state.read_error {
            return Err(io::Error::new(kind, "injected serial read failure"));
        }
        Ok(u32::try_from(state.pending.len()).unwrap_or(u32::MAX))
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.lock();
        if let Some(kind) = state.read_error {
            return Err(io::Error::new(kind, "injected serial read failure"));
        }
        let n = buf.len().min(state.pending.len());
        for (slot, byte) in buf.iter_mut().zip(state.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let mut state = self.lock();
        if let Some(kind) = state.write_error {
            return Err(io::Error::new(kind, "injected serial write failure"));
        }
        state.written.extend_from_slice(data);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
