//! IPv4 protocol - RFC 791

use super::checksum;
use crate::{Error, Result};
use std::net::Ipv4Addr;

/// Minimum IPv4 header size (without options)
pub const MIN_HEADER_SIZE: usize = 20;
/// Bytes of the offending header quoted back in ICMP error messages
pub const QUOTED_HEADER_LEN: usize = 8;

const TTL_OFFSET: usize = 8;
const PROTOCOL_OFFSET: usize = 9;
const CHECKSUM_OFFSET: usize = 10;
const SRC_OFFSET: usize = 12;
const DST_OFFSET: usize = 16;

/// IPv4 protocol numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Protocol {
    Icmp = 1,
    Tcp = 6,
    Udp = 17,
}

impl Protocol {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Protocol::Icmp),
            6 => Some(Protocol::Tcp),
            17 => Some(Protocol::Udp),
            _ => None,
        }
    }
}

/// Validate version and IHL, returning the header length in bytes
fn header_len_of(buffer: &[u8]) -> Result<usize> {
    if buffer.len() < MIN_HEADER_SIZE {
        return Err(Error::Parse(format!(
            "IPv4 header too short ({} bytes)",
            buffer.len()
        )));
    }

    let version = buffer[0] >> 4;
    if version != 4 {
        return Err(Error::Parse(format!("not an IPv4 packet (version {})", version)));
    }

    let header_len = (buffer[0] & 0x0F) as usize * 4;
    if header_len < MIN_HEADER_SIZE {
        return Err(Error::Parse(format!("invalid IHL ({} bytes)", header_len)));
    }
    if buffer.len() < header_len {
        return Err(Error::Parse("IPv4 header truncated".into()));
    }

    Ok(header_len)
}

fn addr_at(buffer: &[u8], offset: usize) -> Ipv4Addr {
    Ipv4Addr::new(
        buffer[offset],
        buffer[offset + 1],
        buffer[offset + 2],
        buffer[offset + 3],
    )
}

/// Parsed IPv4 header (zero-copy reference)
#[derive(Debug)]
pub struct Ipv4Header<'a> {
    buffer: &'a [u8],
    header_len: usize,
}

impl<'a> Ipv4Header<'a> {
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        let header_len = header_len_of(buffer)?;
        Ok(Self { buffer, header_len })
    }

    pub fn header_len(&self) -> usize {
        self.header_len
    }

    pub fn total_length(&self) -> u16 {
        u16::from_be_bytes([self.buffer[2], self.buffer[3]])
    }

    pub fn identification(&self) -> u16 {
        u16::from_be_bytes([self.buffer[4], self.buffer[5]])
    }

    pub fn ttl(&self) -> u8 {
        self.buffer[TTL_OFFSET]
    }

    pub fn protocol(&self) -> u8 {
        self.buffer[PROTOCOL_OFFSET]
    }

    pub fn checksum(&self) -> u16 {
        u16::from_be_bytes([
            self.buffer[CHECKSUM_OFFSET],
            self.buffer[CHECKSUM_OFFSET + 1],
        ])
    }

    pub fn src_addr(&self) -> Ipv4Addr {
        addr_at(self.buffer, SRC_OFFSET)
    }

    pub fn dst_addr(&self) -> Ipv4Addr {
        addr_at(self.buffer, DST_OFFSET)
    }

    /// Validate header checksum
    pub fn validate_checksum(&self) -> bool {
        checksum::verify(self.as_bytes())
    }

    /// Get raw header bytes
    pub fn as_bytes(&self) -> &'a [u8] {
        &self.buffer[..self.header_len]
    }

    /// First bytes of the header, as quoted in ICMP errors
    pub fn quoted(&self) -> [u8; QUOTED_HEADER_LEN] {
        let mut quoted = [0u8; QUOTED_HEADER_LEN];
        quoted.copy_from_slice(&self.buffer[..QUOTED_HEADER_LEN]);
        quoted
    }

    pub fn payload(&self) -> &'a [u8] {
        &self.buffer[self.header_len..]
    }
}

/// Mutable view for rewriting a packet in place (TTL, addresses, checksum)
#[derive(Debug)]
pub struct Ipv4PacketMut<'a> {
    buffer: &'a mut [u8],
    header_len: usize,
}

impl<'a> Ipv4PacketMut<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Result<Self> {
        let header_len = header_len_of(buffer)?;
        Ok(Self { buffer, header_len })
    }

    pub fn ttl(&self) -> u8 {
        self.buffer[TTL_OFFSET]
    }

    /// Decrement TTL and update checksum.
    ///
    /// Returns false, leaving the packet untouched, when the TTL is 1 or 0
    /// and the packet must not be forwarded.
    pub fn decrement_ttl(&mut self) -> bool {
        if self.buffer[TTL_OFFSET] <= 1 {
            return false;
        }

        self.buffer[TTL_OFFSET] -= 1;
        self.update_checksum();
        true
    }

    pub fn src_addr(&self) -> Ipv4Addr {
        addr_at(self.buffer, SRC_OFFSET)
    }

    pub fn dst_addr(&self) -> Ipv4Addr {
        addr_at(self.buffer, DST_OFFSET)
    }

    /// Exchange source and destination addresses (checksum not updated)
    pub fn swap_addrs(&mut self) {
        let (head, tail) = self.buffer.split_at_mut(DST_OFFSET);
        head[SRC_OFFSET..DST_OFFSET].swap_with_slice(&mut tail[..4]);
    }

    /// Recalculate and update header checksum
    pub fn update_checksum(&mut self) {
        checksum::fill(&mut self.buffer[..self.header_len], CHECKSUM_OFFSET);
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.buffer[self.header_len..]
    }
}

/// Builder for unfragmented IPv4 packets without options
#[derive(Debug, Clone)]
pub struct Ipv4Builder {
    identification: u16,
    ttl: u8,
    protocol: u8,
    src_addr: Ipv4Addr,
    dst_addr: Ipv4Addr,
    payload: Vec<u8>,
}

impl Ipv4Builder {
    pub fn new() -> Self {
        Self {
            identification: 0,
            ttl: 64,
            protocol: 0,
            src_addr: Ipv4Addr::UNSPECIFIED,
            dst_addr: Ipv4Addr::UNSPECIFIED,
            payload: Vec::new(),
        }
    }

    pub fn identification(mut self, id: u16) -> Self {
        self.identification = id;
        self
    }

    pub fn ttl(mut self, ttl: u8) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn protocol(mut self, protocol: u8) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn src_addr(mut self, addr: Ipv4Addr) -> Self {
        self.src_addr = addr;
        self
    }

    pub fn dst_addr(mut self, addr: Ipv4Addr) -> Self {
        self.dst_addr = addr;
        self
    }

    pub fn payload(mut self, payload: &[u8]) -> Self {
        self.payload = payload.to_vec();
        self
    }

    pub fn build(self) -> Vec<u8> {
        let total_length = MIN_HEADER_SIZE + self.payload.len();
        let mut buffer = vec![0u8; total_length];

        // Version 4, IHL 5
        buffer[0] = 0x45;
        buffer[2..4].copy_from_slice(&(total_length as u16).to_be_bytes());
        buffer[4..6].copy_from_slice(&self.identification.to_be_bytes());
        buffer[TTL_OFFSET] = self.ttl;
        buffer[PROTOCOL_OFFSET] = self.protocol;
        buffer[SRC_OFFSET..SRC_OFFSET + 4].copy_from_slice(&self.src_addr.octets());
        buffer[DST_OFFSET..DST_OFFSET + 4].copy_from_slice(&self.dst_addr.octets());
        buffer[MIN_HEADER_SIZE..].copy_from_slice(&self.payload);

        checksum::fill(&mut buffer[..MIN_HEADER_SIZE], CHECKSUM_OFFSET);

        buffer
    }
}

impl Default for Ipv4Builder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_simple_packet(ttl: u8) -> Vec<u8> {
        Ipv4Builder::new()
            .src_addr(Ipv4Addr::new(192, 168, 1, 1))
            .dst_addr(Ipv4Addr::new(10, 0, 0, 7))
            .identification(0x1c46)
            .ttl(ttl)
            .protocol(Protocol::Icmp as u8)
            .payload(&[0x08, 0x00, 0xf7, 0xff, 0x00, 0x00, 0x00, 0x00])
            .build()
    }

    #[test]
    fn test_protocol_from_u8() {
        assert_eq!(Protocol::from_u8(1), Some(Protocol::Icmp));
        assert_eq!(Protocol::from_u8(17), Some(Protocol::Udp));
        assert_eq!(Protocol::from_u8(89), None);
    }

    #[test]
    fn test_parse_built_packet() {
        let data = make_simple_packet(64);
        let hdr = Ipv4Header::parse(&data).unwrap();

        assert_eq!(hdr.header_len(), 20);
        assert_eq!(hdr.total_length(), 28);
        assert_eq!(hdr.identification(), 0x1c46);
        assert_eq!(hdr.ttl(), 64);
        assert_eq!(hdr.protocol(), 1);
        assert_eq!(hdr.src_addr(), Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(hdr.dst_addr(), Ipv4Addr::new(10, 0, 0, 7));
        assert_eq!(hdr.payload().len(), 8);
        // No fragmentation flags
        assert_eq!(&data[6..8], &[0, 0]);
        assert!(hdr.validate_checksum());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Ipv4Header::parse(&[0x45; 19]).is_err());

        let mut v6 = make_simple_packet(64);
        v6[0] = 0x65;
        assert!(Ipv4Header::parse(&v6).is_err());

        let mut short_ihl = make_simple_packet(64);
        short_ihl[0] = 0x44;
        assert!(Ipv4Header::parse(&short_ihl).is_err());

        let mut long_ihl = make_simple_packet(64);
        long_ihl[0] = 0x4F;
        assert!(Ipv4Header::parse(&long_ihl).is_err());
    }

    #[test]
    fn test_corrupted_header_fails_checksum() {
        let mut data = make_simple_packet(64);
        data[TTL_OFFSET] = 63;
        let hdr = Ipv4Header::parse(&data).unwrap();
        assert!(!hdr.validate_checksum());
    }

    #[test]
    fn test_quoted_is_first_eight_header_bytes() {
        let data = make_simple_packet(64);
        let hdr = Ipv4Header::parse(&data).unwrap();
        assert_eq!(hdr.quoted(), data[..8]);
    }

    #[test]
    fn test_decrement_ttl_updates_checksum() {
        let mut data = make_simple_packet(5);
        let mut pkt = Ipv4PacketMut::new(&mut data).unwrap();

        assert!(pkt.decrement_ttl());
        assert_eq!(pkt.ttl(), 4);

        let hdr = Ipv4Header::parse(&data).unwrap();
        assert_eq!(hdr.ttl(), 4);
        assert!(hdr.validate_checksum());
    }

    #[test]
    fn test_decrement_ttl_refuses_expiring_packet() {
        for ttl in [0, 1] {
            let mut data = make_simple_packet(ttl);
            let original = data.clone();
            let mut pkt = Ipv4PacketMut::new(&mut data).unwrap();
            assert!(!pkt.decrement_ttl());
            assert_eq!(data, original);
        }
    }

    #[test]
    fn test_swap_addrs() {
        let mut data = make_simple_packet(64);
        let mut pkt = Ipv4PacketMut::new(&mut data).unwrap();
        pkt.swap_addrs();

        assert_eq!(pkt.src_addr(), Ipv4Addr::new(10, 0, 0, 7));
        assert_eq!(pkt.dst_addr(), Ipv4Addr::new(192, 168, 1, 1));

        // A swap keeps the one's-complement sum, so the old checksum still holds
        pkt.update_checksum();
        assert!(Ipv4Header::parse(&data).unwrap().validate_checksum());
    }

    #[test]
    fn test_builder_defaults() {
        let packet = Ipv4Builder::default().build();
        let hdr = Ipv4Header::parse(&packet).unwrap();

        assert_eq!(hdr.ttl(), 64);
        assert_eq!(hdr.total_length(), 20);
        assert!(hdr.validate_checksum());
    }
}
