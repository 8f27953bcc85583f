//! Packet processing router
//!
//! Ties the routing trie, the ARP cache and the pending queue together into
//! a single per-frame state machine. The router never touches a socket: it
//! takes one received frame and returns the frames to transmit.

use crate::dataplane::{
    forward, process_arp, synth, ArpAction, ArpCache, ArpPendingQueue, ForwardAction,
    InterfaceInfo, LpmTrie, PendingForward, PendingPolicy, RouteEntry,
};
use crate::protocol::arp::ArpPacket;
use crate::protocol::ethernet::{self, Frame};
use crate::protocol::icmp::{self, dest_unreachable, time_exceeded, IcmpPacket, IcmpType};
use crate::protocol::ipv4::{Ipv4Header, Ipv4PacketMut, Protocol};
use crate::protocol::{EtherType, MacAddr};
use crate::telemetry::MetricsRegistry;
use crate::Result;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Frames to transmit, each tagged with its egress interface id
pub type Outbound = Vec<(usize, Vec<u8>)>;

/// The forwarding engine state
pub struct Router {
    /// Interfaces indexed by id
    interfaces: Vec<InterfaceInfo>,
    /// Static routes
    routes: LpmTrie,
    /// Resolved next hops
    arp_cache: ArpCache,
    /// Packets waiting for ARP resolution
    arp_pending: ArpPendingQueue,
    /// Metrics registry for statistics
    metrics: Arc<MetricsRegistry>,
}

impl Router {
    /// Create a router with no interfaces or routes
    pub fn new(metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            interfaces: Vec::new(),
            routes: LpmTrie::new(),
            arp_cache: ArpCache::new(),
            arp_pending: ArpPendingQueue::default(),
            metrics,
        }
    }

    /// Get a reference to the metrics registry
    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Add an interface, returning its id
    pub fn add_interface(&mut self, name: &str, mac: MacAddr, ip: Ipv4Addr) -> usize {
        let id = self.interfaces.len();
        debug!("Interface {}: {} {} {}", id, name, ip, mac);
        self.metrics.register_interface(name);
        self.interfaces.push(InterfaceInfo {
            id,
            name: name.to_string(),
            mac,
            ip,
        });
        id
    }

    /// Add a static route; a route with the same prefix and mask is replaced
    pub fn add_route(&mut self, route: RouteEntry) {
        if route.interface >= self.interfaces.len() {
            warn!(
                "Route {} uses interface {} which is not configured",
                route, route.interface
            );
        }
        if let Some(old) = self.routes.insert(route) {
            debug!("Route {} replaced", old);
        }
        self.metrics.route_count.set(self.routes.len());
    }

    /// Add every route of a loaded table
    pub fn add_routes(&mut self, routes: impl IntoIterator<Item = RouteEntry>) {
        for route in routes {
            self.add_route(route);
        }
    }

    /// Replace the pending queue with an empty one using `policy`
    pub fn set_pending_policy(&mut self, policy: PendingPolicy, capacity: usize) {
        self.arp_pending = ArpPendingQueue::new(policy, capacity);
    }

    pub fn interface(&self, id: usize) -> Option<&InterfaceInfo> {
        self.interfaces.get(id)
    }

    pub fn interfaces(&self) -> &[InterfaceInfo] {
        &self.interfaces
    }

    pub fn routes(&self) -> &LpmTrie {
        &self.routes
    }

    pub fn arp_cache(&self) -> &ArpCache {
        &self.arp_cache
    }

    pub fn pending(&self) -> &ArpPendingQueue {
        &self.arp_pending
    }

    /// Name of an interface for diagnostics
    pub fn interface_name(&self, id: usize) -> &str {
        self.interfaces
            .get(id)
            .map(|iface| iface.name.as_str())
            .unwrap_or("?")
    }

    /// Process one received frame
    ///
    /// Returns the frames to transmit as (interface id, frame) pairs.
    pub fn process_frame(&mut self, ingress: usize, packet: &[u8]) -> Outbound {
        let mut to_send = Vec::new();

        let (local_mac, local_ip) = match self.interfaces.get(ingress) {
            Some(iface) => {
                self.metrics.record_rx(&iface.name, packet.len());
                (iface.mac, iface.ip)
            }
            None => {
                warn!("Frame from unknown interface {}", ingress);
                return to_send;
            }
        };

        let frame = match Frame::parse(packet) {
            Ok(f) => f,
            Err(e) => {
                debug!("Dropping frame on {}: {}", self.interface_name(ingress), e);
                self.metrics.record_rx_error(self.interface_name(ingress));
                self.metrics.packets_dropped.inc();
                return to_send;
            }
        };

        match EtherType::from_u16(frame.ethertype()) {
            Some(EtherType::Arp) => {
                self.process_arp_frame(ingress, local_mac, local_ip, &frame, &mut to_send);
            }
            Some(EtherType::Ipv4) => {
                self.process_ipv4_frame(ingress, local_mac, local_ip, &frame, &mut to_send);
            }
            None => {
                trace!("Ignored frame with EtherType 0x{:04x}", frame.ethertype());
                self.metrics.packets_dropped.inc();
            }
        }

        self.metrics.arp_cache_size.set(self.arp_cache.len());
        self.metrics.pending_depth.set(self.arp_pending.len());

        to_send
    }

    /// Process an ARP packet
    fn process_arp_frame(
        &mut self,
        ingress: usize,
        local_mac: MacAddr,
        local_ip: Ipv4Addr,
        frame: &Frame<'_>,
        to_send: &mut Outbound,
    ) {
        let arp = match ArpPacket::parse(frame.payload()) {
            Ok(p) => p,
            Err(e) => {
                debug!("Dropping ARP on {}: {}", self.interface_name(ingress), e);
                self.metrics.packets_dropped.inc();
                return;
            }
        };

        match process_arp(&arp, &mut self.arp_cache, local_ip, local_mac) {
            ArpAction::None => {
                trace!(
                    "Ignored ARP {:?} for {} on {}",
                    arp.operation,
                    arp.target_ip,
                    self.interface_name(ingress)
                );
            }
            ArpAction::Reply(reply) => {
                self.metrics.arp_replies_sent.inc();
                debug!("Sending ARP reply to {} ({})", reply.target_ip, reply.target_mac);
                to_send.push((ingress, synth::arp_reply(local_mac, &reply)));
            }
            ArpAction::Resolved { ip, mac, learned } => {
                if learned {
                    debug!("Learned {} is at {}", ip, mac);
                }

                let released = self.arp_pending.take_for(ip);
                if !released.is_empty() {
                    debug!(
                        "ARP resolved for {}, sending {} queued packets",
                        ip,
                        released.len()
                    );
                }
                for pending in released {
                    self.metrics.arp_replays.inc();
                    self.metrics.packets_forwarded.inc();
                    let interface = pending.interface;
                    to_send.push((interface, pending.into_frame(mac)));
                }
            }
        }
    }

    /// Process an IPv4 packet
    fn process_ipv4_frame(
        &mut self,
        ingress: usize,
        local_mac: MacAddr,
        local_ip: Ipv4Addr,
        frame: &Frame<'_>,
        to_send: &mut Outbound,
    ) {
        let header = match Ipv4Header::parse(frame.payload()) {
            Ok(h) => h,
            Err(e) => {
                debug!("Dropping IPv4 on {}: {}", self.interface_name(ingress), e);
                self.metrics.packets_dropped.inc();
                return;
            }
        };

        if !header.validate_checksum() {
            warn!(
                "Packet is corrupted: bad header checksum 0x{:04x} from {}",
                header.checksum(),
                header.src_addr()
            );
            self.metrics.checksum_errors.inc();
            self.metrics.packets_dropped.inc();
            return;
        }

        let total_len = header.total_length() as usize;
        if total_len < header.header_len() || total_len > frame.payload().len() {
            debug!(
                "Dropping IPv4 from {}: total length {} does not fit {} bytes",
                header.src_addr(),
                total_len,
                frame.payload().len()
            );
            self.metrics.packets_dropped.inc();
            return;
        }

        let mut buffer = frame.as_bytes().to_vec();

        // The reply is routed like any other packet, TTL included
        if header.dst_addr() == local_ip && is_echo_request(&header, total_len) {
            if let Err(e) = make_echo_reply(&mut buffer, header.header_len(), total_len) {
                debug!("Cannot answer echo from {}: {}", header.src_addr(), e);
                self.metrics.packets_dropped.inc();
                return;
            }
            self.metrics.icmp_echo_replies.inc();
            debug!("Answering echo request from {}", header.src_addr());
        }

        let action = match forward(buffer, &self.routes, &self.arp_cache) {
            Ok(action) => action,
            Err(e) => {
                debug!("Dropping IPv4 from {}: {}", header.src_addr(), e);
                self.metrics.packets_dropped.inc();
                return;
            }
        };

        match action {
            ForwardAction::NoRoute { .. } => {
                debug!(
                    "No route for packet from {}, sending destination unreachable",
                    header.src_addr()
                );
                self.metrics.icmp_dest_unreachable.inc();
                to_send.push((
                    ingress,
                    synth::icmp_error(
                        local_mac,
                        local_ip,
                        frame.src_mac(),
                        &header,
                        IcmpType::DestinationUnreachable,
                        dest_unreachable::NET_UNREACHABLE,
                    ),
                ));
            }
            ForwardAction::TtlExpired { .. } => {
                debug!(
                    "TTL expired for packet from {} to {}",
                    header.src_addr(),
                    header.dst_addr()
                );
                self.metrics.icmp_time_exceeded.inc();
                to_send.push((
                    ingress,
                    synth::icmp_error(
                        local_mac,
                        local_ip,
                        frame.src_mac(),
                        &header,
                        IcmpType::TimeExceeded,
                        time_exceeded::TTL_EXCEEDED,
                    ),
                ));
            }
            ForwardAction::Forward {
                interface,
                next_hop_mac,
                mut frame,
            } => {
                let Some(egress) = self.interfaces.get(interface) else {
                    warn!("Route to {} uses unknown interface {}", header.dst_addr(), interface);
                    self.metrics.packets_dropped.inc();
                    return;
                };

                ethernet::rewrite_macs(&mut frame, next_hop_mac, egress.mac);
                self.metrics.packets_forwarded.inc();
                trace!(
                    "Forwarding {} -> {} via {} ({})",
                    header.src_addr(),
                    header.dst_addr(),
                    egress.name,
                    next_hop_mac
                );
                to_send.push((interface, frame));
            }
            ForwardAction::Unresolved {
                interface,
                next_hop,
                mut frame,
            } => {
                let Some(egress) = self.interfaces.get(interface) else {
                    warn!("Route to {} uses unknown interface {}", header.dst_addr(), interface);
                    self.metrics.packets_dropped.inc();
                    return;
                };
                let (egress_mac, egress_ip) = (egress.mac, egress.ip);

                // Destination is patched on replay
                ethernet::rewrite_macs(&mut frame, MacAddr::ZERO, egress_mac);
                let queued = self.arp_pending.enqueue(PendingForward {
                    frame,
                    interface,
                    next_hop,
                });
                if !queued {
                    warn!(
                        "Pending queue full ({} packets), dropping packet for {}",
                        self.arp_pending.len(),
                        next_hop
                    );
                    self.metrics.packets_dropped.inc();
                }

                self.metrics.arp_requests_sent.inc();
                debug!(
                    "Sending ARP request for {} on {}",
                    next_hop,
                    self.interface_name(interface)
                );
                to_send.push((interface, synth::arp_request(egress_mac, egress_ip, next_hop)));
            }
        }
    }
}

fn is_echo_request(header: &Ipv4Header<'_>, total_len: usize) -> bool {
    if header.protocol() != Protocol::Icmp as u8 {
        return false;
    }
    let message = &header.payload()[..total_len - header.header_len()];
    IcmpPacket::parse(message)
        .map(|icmp| icmp.icmp_type() == IcmpType::EchoRequest as u8)
        .unwrap_or(false)
}

/// Rewrite the echo request in `frame` into its reply.
///
/// Addresses are swapped and the TTL is kept. The IP checksum is left for
/// the forwarding step.
fn make_echo_reply(frame: &mut [u8], header_len: usize, total_len: usize) -> Result<()> {
    let mut packet = Ipv4PacketMut::new(&mut frame[ethernet::HEADER_SIZE..])?;
    packet.swap_addrs();
    icmp::echo_reply_in_place(&mut packet.payload_mut()[..total_len - header_len])
}
