//! ARP packet processor
//!
//! Handles ARP request/reply logic, cache updates and the queue of packets
//! waiting for a next hop to resolve.

use crate::dataplane::ArpCache;
use crate::protocol::arp::{ArpOp, ArpPacket};
use crate::protocol::ethernet;
use crate::protocol::MacAddr;
use serde::Deserialize;
use std::collections::VecDeque;
use std::fmt;
use std::net::Ipv4Addr;

/// Result of processing an ARP packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArpAction {
    /// Not addressed to this interface
    None,
    /// Send an ARP reply
    Reply(ArpPacket),
    /// A reply told us where `ip` lives; queued packets may be replayed
    Resolved {
        ip: Ipv4Addr,
        mac: MacAddr,
        /// False when the cache already held an entry for `ip`
        learned: bool,
    },
}

/// Process an incoming ARP packet
///
/// Only packets whose target is `local_ip` are acted upon. The cache is
/// updated from replies alone; requests are answered without learning the
/// requester.
pub fn process_arp(
    packet: &ArpPacket,
    cache: &mut ArpCache,
    local_ip: Ipv4Addr,
    local_mac: MacAddr,
) -> ArpAction {
    if packet.target_ip != local_ip {
        return ArpAction::None;
    }

    match packet.operation {
        ArpOp::Request => ArpAction::Reply(ArpPacket::reply(
            local_mac,
            local_ip,
            packet.sender_mac,
            packet.sender_ip,
        )),
        ArpOp::Reply => {
            let learned = cache.record(packet.sender_ip, packet.sender_mac);
            let mac = cache.lookup_mac(packet.sender_ip).unwrap_or(packet.sender_mac);
            ArpAction::Resolved {
                ip: packet.sender_ip,
                mac,
                learned,
            }
        }
    }
}

/// Default total number of packets held while waiting for ARP
pub const DEFAULT_PENDING_CAPACITY: usize = 64;

/// Which queued packets a resolved next hop releases
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PendingPolicy {
    /// Every packet waiting on the resolved address, in arrival order
    #[default]
    PerNextHop,
    /// Exactly one packet from the head of the queue, whatever it waits on
    Fifo,
}

impl fmt::Display for PendingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingPolicy::PerNextHop => write!(f, "per-next-hop"),
            PendingPolicy::Fifo => write!(f, "fifo"),
        }
    }
}

/// A forwarded packet parked until its next hop resolves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingForward {
    /// Complete Ethernet frame, TTL already decremented
    pub frame: Vec<u8>,
    /// Egress interface id
    pub interface: usize,
    /// Address whose MAC is missing
    pub next_hop: Ipv4Addr,
}

impl PendingForward {
    pub fn len(&self) -> usize {
        self.frame.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    /// Patch the destination MAC and hand back the frame
    pub fn into_frame(mut self, dst: MacAddr) -> Vec<u8> {
        self.frame[..6].copy_from_slice(&dst.0);
        self.frame
    }
}

/// Queue for packets waiting on ARP resolution
///
/// When a packet needs to go out but the next hop's MAC is unknown, the
/// packet is parked here and an ARP request is sent. When the reply comes
/// back, [`take_for`](Self::take_for) releases packets according to the
/// configured policy.
#[derive(Debug)]
pub struct ArpPendingQueue {
    queue: VecDeque<PendingForward>,
    policy: PendingPolicy,
    /// Maximum packets held across all next hops
    capacity: usize,
}

impl ArpPendingQueue {
    pub fn new(policy: PendingPolicy, capacity: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            policy,
            capacity,
        }
    }

    /// Park a packet.
    ///
    /// Returns false, dropping the packet, if the queue is full or the
    /// snapshot is too short to hold an Ethernet header.
    pub fn enqueue(&mut self, pending: PendingForward) -> bool {
        if self.queue.len() >= self.capacity || pending.len() < ethernet::HEADER_SIZE {
            return false;
        }
        self.queue.push_back(pending);
        true
    }

    /// Release the packets a reply for `ip` unblocks
    pub fn take_for(&mut self, ip: Ipv4Addr) -> Vec<PendingForward> {
        match self.policy {
            PendingPolicy::PerNextHop => {
                let (ready, waiting): (VecDeque<_>, VecDeque<_>) = self
                    .queue
                    .drain(..)
                    .partition(|pending| pending.next_hop == ip);
                self.queue = waiting;
                ready.into()
            }
            PendingPolicy::Fifo => self.queue.pop_front().into_iter().collect(),
        }
    }

    /// Check if there are pending packets for an IP
    pub fn has_pending(&self, ip: Ipv4Addr) -> bool {
        self.queue.iter().any(|pending| pending.next_hop == ip)
    }

    /// Number of parked packets
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Default for ArpPendingQueue {
    fn default() -> Self {
        Self::new(PendingPolicy::default(), DEFAULT_PENDING_CAPACITY)
    }
}
