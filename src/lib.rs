//! softrouter - Software IPv4 Router
//!
//! A userspace IPv4 forwarding engine. Routes are loaded once into a
//! longest-prefix-match trie; next hops are resolved with ARP on demand
//! while the packets waiting on them are parked in a pending queue.

pub mod capture;
pub mod config;
pub mod dataplane;
pub mod error;
pub mod protocol;
pub mod telemetry;

pub use error::{Error, Result};
