//! Telnet protocol helpers.
//!
//! The relay is byte-transparent; the only Telnet awareness it has is the
//! ability to recognise IAC command triples so they can be excluded from the
//! observed (logged) view of client traffic.

pub mod iac;
