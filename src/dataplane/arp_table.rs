//! ARP cache (IP to MAC mapping)
//!
//! Entries are learned from ARP replies addressed to the router and are
//! never aged out or overwritten for the lifetime of the process.

use crate::protocol::MacAddr;
use std::collections::HashMap;
use std::net::Ipv4Addr;

/// Append-only ARP cache
#[derive(Debug, Default)]
pub struct ArpCache {
    entries: HashMap<Ipv4Addr, MacAddr>,
}

impl ArpCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lookup MAC address for an IP
    pub fn lookup_mac(&self, ip: Ipv4Addr) -> Option<MacAddr> {
        self.entries.get(&ip).copied()
    }

    /// Record a binding if `ip` is not known yet.
    ///
    /// Returns true when a new entry was created. An existing entry is kept
    /// as is, even if `mac` differs.
    pub fn record(&mut self, ip: Ipv4Addr, mac: MacAddr) -> bool {
        if self.entries.contains_key(&ip) {
            return false;
        }
        self.entries.insert(ip, mac);
        true
    }

    /// All known bindings, in no particular order
    pub fn entries(&self) -> impl Iterator<Item = (Ipv4Addr, MacAddr)> + '_ {
        self.entries.iter().map(|(ip, mac)| (*ip, *mac))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
