//! Shared fixtures for the integration tests
//!
//! ```text
//!   host (192.168.0.2) -- r-0 [192.168.0.1] router [10.0.0.1] r-1 -- gateway (10.0.0.2)
//! ```

#![allow(dead_code)]

use softrouter::dataplane::{RouteEntry, Router};
use softrouter::protocol::arp::{ArpOp, ArpPacket};
use softrouter::protocol::checksum;
use softrouter::protocol::ethernet::{Frame, FrameBuilder, HEADER_SIZE};
use softrouter::protocol::ipv4::{Ipv4Builder, Ipv4Header, Protocol};
use softrouter::protocol::{EtherType, MacAddr};
use softrouter::telemetry::MetricsRegistry;
use std::net::Ipv4Addr;
use std::sync::Arc;

pub const R0_MAC: MacAddr = MacAddr([0xde, 0xad, 0xbe, 0xef, 0x00, 0x00]);
pub const R0_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 0, 1);
pub const R1_MAC: MacAddr = MacAddr([0xde, 0xad, 0xbe, 0xef, 0x00, 0x01]);
pub const R1_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);

pub const HOST_MAC: MacAddr = MacAddr([0x02, 0x00, 0x00, 0x00, 0x00, 0x02]);
pub const HOST_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 0, 2);
pub const GATEWAY_MAC: MacAddr = MacAddr([0x02, 0x00, 0x00, 0x00, 0x01, 0x02]);
pub const GATEWAY_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);

/// Two interfaces, a /16 toward the host side and a /8 toward the gateway
pub fn router() -> Router {
    let mut router = Router::new(Arc::new(MetricsRegistry::new()));
    router.add_interface("r-0", R0_MAC, R0_IP);
    router.add_interface("r-1", R1_MAC, R1_IP);
    router.add_routes([
        RouteEntry::new(
            Ipv4Addr::new(192, 168, 0, 0),
            Ipv4Addr::new(255, 255, 0, 0),
            HOST_IP,
            0,
        ),
        RouteEntry::new(
            Ipv4Addr::new(10, 0, 0, 0),
            Ipv4Addr::new(255, 0, 0, 0),
            GATEWAY_IP,
            1,
        ),
    ]);
    router
}

fn ethernet(dst: MacAddr, src: MacAddr, ethertype: EtherType, payload: &[u8]) -> Vec<u8> {
    FrameBuilder::new()
        .dst_mac(dst)
        .src_mac(src)
        .ethertype(ethertype as u16)
        .payload(payload)
        .build()
}

/// A UDP-ish datagram from the host, addressed to the r-0 MAC
pub fn datagram(dst: Ipv4Addr, ttl: u8) -> Vec<u8> {
    let packet = Ipv4Builder::new()
        .identification(0x1234)
        .ttl(ttl)
        .protocol(Protocol::Udp as u8)
        .src_addr(HOST_IP)
        .dst_addr(dst)
        .payload(b"payload bytes")
        .build();
    ethernet(R0_MAC, HOST_MAC, EtherType::Ipv4, &packet)
}

/// ICMP echo request from the host
pub fn echo_request(dst: Ipv4Addr, identifier: u16, sequence: u16) -> Vec<u8> {
    echo_request_with_ttl(dst, 64, identifier, sequence)
}

pub fn echo_request_with_ttl(dst: Ipv4Addr, ttl: u8, identifier: u16, sequence: u16) -> Vec<u8> {
    let mut message = vec![8, 0, 0, 0];
    message.extend_from_slice(&identifier.to_be_bytes());
    message.extend_from_slice(&sequence.to_be_bytes());
    message.extend_from_slice(b"abcdefghijklmnop");
    checksum::fill(&mut message, 2);

    let packet = Ipv4Builder::new()
        .ttl(ttl)
        .protocol(Protocol::Icmp as u8)
        .src_addr(HOST_IP)
        .dst_addr(dst)
        .payload(&message)
        .build();
    ethernet(R0_MAC, HOST_MAC, EtherType::Ipv4, &packet)
}

/// Broadcast who-has from `sender`
pub fn arp_request(sender_mac: MacAddr, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Vec<u8> {
    let request = ArpPacket::request(sender_mac, sender_ip, target_ip);
    ethernet(MacAddr::BROADCAST, sender_mac, EtherType::Arp, &request.to_bytes())
}

/// Unicast is-at from `sender` to the router interface `target`
pub fn arp_reply(
    sender_mac: MacAddr,
    sender_ip: Ipv4Addr,
    target_mac: MacAddr,
    target_ip: Ipv4Addr,
) -> Vec<u8> {
    let reply = ArpPacket::reply(sender_mac, sender_ip, target_mac, target_ip);
    ethernet(target_mac, sender_mac, EtherType::Arp, &reply.to_bytes())
}

/// The gateway announcing itself on r-1
pub fn gateway_reply() -> Vec<u8> {
    arp_reply(GATEWAY_MAC, GATEWAY_IP, R1_MAC, R1_IP)
}

/// The host announcing itself on r-0
pub fn host_reply() -> Vec<u8> {
    arp_reply(HOST_MAC, HOST_IP, R0_MAC, R0_IP)
}

pub fn ipv4_of(frame: &[u8]) -> Ipv4Header<'_> {
    Ipv4Header::parse(&frame[HEADER_SIZE..]).unwrap()
}

pub fn arp_of(frame: &[u8]) -> ArpPacket {
    let eth = Frame::parse(frame).unwrap();
    assert_eq!(eth.ethertype(), EtherType::Arp as u16);
    ArpPacket::parse(eth.payload()).unwrap()
}

pub fn is_arp_request_for(frame: &[u8], target: Ipv4Addr) -> bool {
    let eth = Frame::parse(frame).unwrap();
    eth.ethertype() == EtherType::Arp as u16
        && eth.dst_mac().is_broadcast()
        && ArpPacket::parse(eth.payload())
            .map(|arp| arp.operation == ArpOp::Request && arp.target_ip == target)
            .unwrap_or(false)
}
