//! Wire formats spoken by the router
//!
//! Each module offers a length-checked parser returning a typed view and a
//! builder or serializer producing exact-sized buffers in network order.

pub mod arp;
pub mod checksum;
pub mod ethernet;
pub mod icmp;
pub mod ipv4;
pub mod types;

pub use types::*;
