//! Single-occupancy connection slot.
//!
//! The serial device can only be driven by one TCP client at a time.  The
//! [`ConnectionSlot`] is the one place that decides who that client is: the
//! listener calls [`ConnectionSlot::try_acquire`] for every accepted
//! connection and the session calls [`ConnectionSlot::release`] when it has
//! fully torn down.
//!
//! ```text
//!            try_acquire(peer) == true
//!   Empty ───────────────────────────────▶ Occupied(peer)
//!     ▲                                        │
//!     └──────────────── release() ─────────────┘
//!
//!   Occupied(peer) + try_acquire(other) == false   (caller drops `other`)
//! ```
//!
//! A plain `std::sync::Mutex` is enough: the critical sections are a few
//! instructions long and never cross an `.await`.

use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

/// The peer currently holding the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotOccupant {
    pub peer: SocketAddr,
    pub acquired_at: Instant,
}

impl SlotOccupant {
    /// How long the peer has held the slot.
    pub fn held_for(&self) -> Duration {
        self.acquired_at.elapsed()
    }
}

/// Holds at most one active peer.
#[derive(Debug, Default)]
pub struct ConnectionSlot {
    occupant: Mutex<Option<SlotOccupant>>,
}

impl ConnectionSlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the slot for `peer` if it is empty.
    ///
    /// Returns `false` (and leaves the current occupant untouched) when the
    /// slot is already taken; the caller must then close the new connection.
    pub fn try_acquire(&self, peer: SocketAddr) -> bool {
        let mut occupant = self.lock();
        if let Some(current) = occupant.as_ref() {
            debug!("slot busy with {}; refusing {peer}", current.peer);
            return false;
        }
        *occupant = Some(SlotOccupant {
            peer,
            acquired_at: Instant::now(),
        });
        debug!("slot acquired by {peer}");
        true
    }

    /// Empties the slot and returns the previous occupant, if any.
    ///
    /// Calling this on an empty slot is a no-op.
    pub fn release(&self) -> Option<SlotOccupant> {
        let previous = self.lock().take();
        if let Some(ref prev) = previous {
            debug!("slot released by {} after {:?}", prev.peer, prev.held_for());
        }
        previous
    }

    /// Returns the current occupant without changing the slot.
    pub fn occupant(&self) -> Option<SlotOccupant> {
        *self.lock()
    }

    pub fn is_occupied(&self) -> bool {
        self.lock().is_some()
    }

    // A panic while holding the lock cannot leave the Option half-written,
    // so a poisoned guard is still consistent.
    fn lock(&self) -> MutexGuard<'_, Option<SlotOccupant>> {
        self.occupant.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
