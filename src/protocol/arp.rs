//! ARP (Address Resolution Protocol) - RFC 826
//!
//! Only the Ethernet/IPv4 flavour is understood: hardware type 1,
//! protocol type 0x0800, 6-byte hardware and 4-byte protocol addresses.

use super::{EtherType, MacAddr};
use crate::{Error, Result};
use std::net::Ipv4Addr;

/// ARP packet size (for Ethernet/IPv4)
pub const ARP_PACKET_SIZE: usize = 28;

const HTYPE_ETHERNET: u16 = 1;
const HLEN_ETHERNET: u8 = 6;
const PLEN_IPV4: u8 = 4;

/// ARP operation codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ArpOp {
    Request = 1,
    Reply = 2,
}

impl ArpOp {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(ArpOp::Request),
            2 => Some(ArpOp::Reply),
            _ => None,
        }
    }
}

/// ARP packet (Ethernet/IPv4)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArpPacket {
    pub operation: ArpOp,
    pub sender_mac: MacAddr,
    pub sender_ip: Ipv4Addr,
    pub target_mac: MacAddr,
    pub target_ip: Ipv4Addr,
}

fn ipv4_at(buffer: &[u8], offset: usize) -> Ipv4Addr {
    Ipv4Addr::new(
        buffer[offset],
        buffer[offset + 1],
        buffer[offset + 2],
        buffer[offset + 3],
    )
}

impl ArpPacket {
    /// Parse an ARP packet from the payload of an Ethernet frame
    pub fn parse(buffer: &[u8]) -> Result<Self> {
        if buffer.len() < ARP_PACKET_SIZE {
            return Err(Error::Parse(format!(
                "ARP packet too short ({} bytes)",
                buffer.len()
            )));
        }

        let htype = u16::from_be_bytes([buffer[0], buffer[1]]);
        let ptype = u16::from_be_bytes([buffer[2], buffer[3]]);
        if htype != HTYPE_ETHERNET || ptype != EtherType::Ipv4 as u16 {
            return Err(Error::Parse(format!(
                "unsupported ARP hardware/protocol type {:#06x}/{:#06x}",
                htype, ptype
            )));
        }

        if buffer[4] != HLEN_ETHERNET || buffer[5] != PLEN_IPV4 {
            return Err(Error::Parse("invalid ARP address lengths".into()));
        }

        let op = u16::from_be_bytes([buffer[6], buffer[7]]);
        let operation = ArpOp::from_u16(op)
            .ok_or_else(|| Error::Parse(format!("invalid ARP operation {}", op)))?;

        // Length was checked above, so the slices are always 6 bytes long
        let sender_mac = MacAddr::from_slice(&buffer[8..14]).unwrap_or_default();
        let target_mac = MacAddr::from_slice(&buffer[18..24]).unwrap_or_default();

        Ok(Self {
            operation,
            sender_mac,
            sender_ip: ipv4_at(buffer, 14),
            target_mac,
            target_ip: ipv4_at(buffer, 24),
        })
    }

    /// Serialize in network byte order
    pub fn to_bytes(&self) -> [u8; ARP_PACKET_SIZE] {
        let mut buf = [0u8; ARP_PACKET_SIZE];

        buf[0..2].copy_from_slice(&HTYPE_ETHERNET.to_be_bytes());
        buf[2..4].copy_from_slice(&(EtherType::Ipv4 as u16).to_be_bytes());
        buf[4] = HLEN_ETHERNET;
        buf[5] = PLEN_IPV4;
        buf[6..8].copy_from_slice(&(self.operation as u16).to_be_bytes());
        buf[8..14].copy_from_slice(&self.sender_mac.0);
        buf[14..18].copy_from_slice(&self.sender_ip.octets());
        buf[18..24].copy_from_slice(&self.target_mac.0);
        buf[24..28].copy_from_slice(&self.target_ip.octets());

        buf
    }

    /// Who-has `target_ip`? Tell `sender_ip`.
    pub fn request(sender_mac: MacAddr, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Self {
        Self {
            operation: ArpOp::Request,
            sender_mac,
            sender_ip,
            target_mac: MacAddr::ZERO,
            target_ip,
        }
    }

    /// `sender_ip` is-at `sender_mac`, addressed to the original requester
    pub fn reply(
        sender_mac: MacAddr,
        sender_ip: Ipv4Addr,
        target_mac: MacAddr,
        target_ip: Ipv4Addr,
    ) -> Self {
        Self {
            operation: ArpOp::Reply,
            sender_mac,
            sender_ip,
            target_mac,
            target_ip,
        }
    }
}
