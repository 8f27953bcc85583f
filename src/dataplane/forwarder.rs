//! Packet forwarder
//!
//! Handles IPv4 forwarding decisions: longest-prefix-match lookup, TTL
//! handling and next-hop resolution through the ARP cache.

use crate::dataplane::{ArpCache, LpmTrie};
use crate::protocol::ethernet;
use crate::protocol::ipv4::Ipv4PacketMut;
use crate::protocol::MacAddr;
use crate::{Error, Result};
use std::fmt;
use std::net::Ipv4Addr;

/// Addresses of one router interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceInfo {
    /// Position on the command line; route table entries refer to it
    pub id: usize,
    pub name: String,
    pub mac: MacAddr,
    pub ip: Ipv4Addr,
}

impl fmt::Display for InterfaceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {}, {})", self.id, self.name, self.ip, self.mac)
    }
}

/// Result of a forwarding decision
///
/// Every variant hands the frame back to the caller. `Forward` and
/// `Unresolved` carry it with the TTL already decremented and the header
/// checksum updated; the other variants return it untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardAction {
    /// Send to `interface` with destination MAC `next_hop_mac`
    Forward {
        interface: usize,
        next_hop_mac: MacAddr,
        frame: Vec<u8>,
    },
    /// Next hop's MAC is unknown; the frame must wait for ARP
    Unresolved {
        interface: usize,
        next_hop: Ipv4Addr,
        frame: Vec<u8>,
    },
    /// No route to destination (Destination Unreachable)
    NoRoute { frame: Vec<u8> },
    /// TTL would reach zero (Time Exceeded)
    TtlExpired { frame: Vec<u8> },
}

/// Decide what happens to an IPv4 frame.
///
/// `frame` is a complete Ethernet frame carrying an IPv4 packet. Route
/// lookup comes before the TTL check, so a packet with no route is reported
/// as unreachable whatever its TTL.
pub fn forward(mut frame: Vec<u8>, routes: &LpmTrie, cache: &ArpCache) -> Result<ForwardAction> {
    let ip_bytes = frame
        .get_mut(ethernet::HEADER_SIZE..)
        .ok_or_else(|| Error::InvalidPacket("frame shorter than Ethernet header".into()))?;
    let mut packet = Ipv4PacketMut::new(ip_bytes)?;

    let route = match routes.lookup(packet.dst_addr()) {
        Some(route) => route,
        None => return Ok(ForwardAction::NoRoute { frame }),
    };

    if !packet.decrement_ttl() {
        return Ok(ForwardAction::TtlExpired { frame });
    }

    let action = match cache.lookup_mac(route.next_hop) {
        Some(next_hop_mac) => ForwardAction::Forward {
            interface: route.interface,
            next_hop_mac,
            frame,
        },
        None => ForwardAction::Unresolved {
            interface: route.interface,
            next_hop: route.next_hop,
            frame,
        },
    };
    Ok(action)
}
