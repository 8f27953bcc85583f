//! Frames the router originates itself
//!
//! ARP requests and replies, and ICMP errors quoting an offending packet.
//! Every builder returns an exact-sized Ethernet frame ready to transmit.

use crate::protocol::arp::{ArpPacket, ARP_PACKET_SIZE};
use crate::protocol::ethernet::{FrameBuilder, HEADER_SIZE};
use crate::protocol::icmp::{self, IcmpType, ICMP_ERROR_SIZE};
use crate::protocol::ipv4::{Ipv4Builder, Ipv4Header, Protocol, MIN_HEADER_SIZE};
use crate::protocol::{EtherType, MacAddr};
use std::net::Ipv4Addr;

/// Identification field of every ICMP error datagram
pub const ICMP_ERROR_IDENT: u16 = 1;
/// TTL of datagrams originated by the router
pub const DEFAULT_TTL: u8 = 64;

/// Size of an ARP frame on the wire, without padding
pub const ARP_FRAME_SIZE: usize = HEADER_SIZE + ARP_PACKET_SIZE;
/// Size of an ICMP error frame
pub const ICMP_ERROR_FRAME_SIZE: usize = HEADER_SIZE + MIN_HEADER_SIZE + ICMP_ERROR_SIZE;

fn arp_frame(src_mac: MacAddr, dst_mac: MacAddr, packet: &ArpPacket) -> Vec<u8> {
    FrameBuilder::with_payload_capacity(ARP_PACKET_SIZE)
        .dst_mac(dst_mac)
        .src_mac(src_mac)
        .ethertype(EtherType::Arp as u16)
        .payload(&packet.to_bytes())
        .build()
}

/// Broadcast who-has `target_ip`, asked by the interface at `src_mac`/`src_ip`
pub fn arp_request(src_mac: MacAddr, src_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Vec<u8> {
    let request = ArpPacket::request(src_mac, src_ip, target_ip);
    arp_frame(src_mac, MacAddr::BROADCAST, &request)
}

/// Unicast `reply` back to its target, sent from `src_mac`
pub fn arp_reply(src_mac: MacAddr, reply: &ArpPacket) -> Vec<u8> {
    arp_frame(src_mac, reply.target_mac, reply)
}

/// Build an ICMP error about `offending`.
///
/// The message quotes the first 8 bytes of the offending header and is
/// addressed to its source from the receiving interface (`src_mac`,
/// `src_ip`), with `dst_mac` the link address the offending frame came from.
pub fn icmp_error(
    src_mac: MacAddr,
    src_ip: Ipv4Addr,
    dst_mac: MacAddr,
    offending: &Ipv4Header<'_>,
    icmp_type: IcmpType,
    code: u8,
) -> Vec<u8> {
    let message = icmp::build_error(icmp_type, code, &offending.quoted());

    let packet = Ipv4Builder::new()
        .identification(ICMP_ERROR_IDENT)
        .ttl(DEFAULT_TTL)
        .protocol(Protocol::Icmp as u8)
        .src_addr(src_ip)
        .dst_addr(offending.src_addr())
        .payload(&message)
        .build();

    FrameBuilder::with_payload_capacity(packet.len())
        .dst_mac(dst_mac)
        .src_mac(src_mac)
        .ethertype(EtherType::Ipv4 as u16)
        .payload(&packet)
        .build()
}
