//! Domain entities shared by the relay.
//!
//! Pure state with no I/O: the types here can be exercised from plain
//! `#[test]` functions without a runtime or sockets.

pub mod slot;

pub use slot::{ConnectionSlot, SlotOccupant};
