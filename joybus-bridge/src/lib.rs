//! Host-side harness for a Joybus serial bridge CRC reference oracle.
//!
//! The bridge is a USB-serial device that forwards packets onto a Nintendo
//! controller (Joybus) bus and reports the 8-bit CRC the real peripheral
//! hardware computed over them. This crate frames requests, handles the
//! retransmit-on-short-reply protocol, and batches packet-to-CRC queries
//! into test-vector maps. The host never computes a CRC itself.

pub mod config;
pub mod error;
pub mod link;
pub mod packet;
pub mod protocol;
pub mod tracing;

// Re-export the types most callers need
pub use config::BridgeConfig;
pub use error::{Error, Result};
pub use link::BridgeLink;
pub use packet::Packet;
