//! ICMP (Internet Control Message Protocol) - RFC 792

use super::checksum;
use super::ipv4::QUOTED_HEADER_LEN;
use crate::{Error, Result};

/// ICMP header size (type, code, checksum, rest-of-header)
pub const ICMP_HEADER_SIZE: usize = 8;
/// Size of the error messages the router emits: header plus quoted bytes
pub const ICMP_ERROR_SIZE: usize = ICMP_HEADER_SIZE + QUOTED_HEADER_LEN;

const CHECKSUM_OFFSET: usize = 2;

/// ICMP message types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum IcmpType {
    EchoReply = 0,
    DestinationUnreachable = 3,
    EchoRequest = 8,
    TimeExceeded = 11,
}

impl IcmpType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(IcmpType::EchoReply),
            3 => Some(IcmpType::DestinationUnreachable),
            8 => Some(IcmpType::EchoRequest),
            11 => Some(IcmpType::TimeExceeded),
            _ => None,
        }
    }
}

/// Destination Unreachable codes (RFC 792)
pub mod dest_unreachable {
    /// Network unreachable
    pub const NET_UNREACHABLE: u8 = 0;
}

/// Time Exceeded codes (RFC 792)
pub mod time_exceeded {
    /// TTL exceeded in transit
    pub const TTL_EXCEEDED: u8 = 0;
}

/// Parsed ICMP message
#[derive(Debug)]
pub struct IcmpPacket<'a> {
    buffer: &'a [u8],
}

impl<'a> IcmpPacket<'a> {
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        if buffer.len() < ICMP_HEADER_SIZE {
            return Err(Error::Parse("ICMP packet too short".into()));
        }

        Ok(Self { buffer })
    }

    pub fn icmp_type(&self) -> u8 {
        self.buffer[0]
    }

    pub fn code(&self) -> u8 {
        self.buffer[1]
    }

    /// For Echo Request/Reply: identifier
    pub fn identifier(&self) -> u16 {
        u16::from_be_bytes([self.buffer[4], self.buffer[5]])
    }

    /// For Echo Request/Reply: sequence number
    pub fn sequence(&self) -> u16 {
        u16::from_be_bytes([self.buffer[6], self.buffer[7]])
    }

    /// Bytes after the 8-byte header
    pub fn payload(&self) -> &'a [u8] {
        &self.buffer[ICMP_HEADER_SIZE..]
    }

    pub fn validate_checksum(&self) -> bool {
        checksum::verify(self.buffer)
    }
}

/// Turn an Echo Request into an Echo Reply in place.
///
/// Type and code become 0 and the checksum is recomputed over the whole
/// message; identifier, sequence and data are kept.
pub fn echo_reply_in_place(message: &mut [u8]) -> Result<()> {
    if message.len() < ICMP_HEADER_SIZE {
        return Err(Error::InvalidPacket("ICMP message too short".into()));
    }

    message[0] = IcmpType::EchoReply as u8;
    message[1] = 0;
    checksum::fill(message, CHECKSUM_OFFSET);
    Ok(())
}

/// Build an error message (Destination Unreachable, Time Exceeded).
///
/// The rest-of-header word is zero and the body is the quoted start of the
/// offending IP header.
pub fn build_error(
    icmp_type: IcmpType,
    code: u8,
    quoted: &[u8; QUOTED_HEADER_LEN],
) -> [u8; ICMP_ERROR_SIZE] {
    let mut message = [0u8; ICMP_ERROR_SIZE];
    message[0] = icmp_type as u8;
    message[1] = code;
    message[ICMP_HEADER_SIZE..].copy_from_slice(quoted);
    checksum::fill(&mut message, CHECKSUM_OFFSET);
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_echo_request() -> Vec<u8> {
        let mut msg = vec![
            0x08, 0x00, 0x00, 0x00, // type, code, checksum
            0x12, 0x34, 0x00, 0x07, // identifier, sequence
            b'p', b'i', b'n', b'g', b'!', // odd-length data
        ];
        checksum::fill(&mut msg, CHECKSUM_OFFSET);
        msg
    }

    #[test]
    fn test_icmp_type_from_u8() {
        assert_eq!(IcmpType::from_u8(0), Some(IcmpType::EchoReply));
        assert_eq!(IcmpType::from_u8(3), Some(IcmpType::DestinationUnreachable));
        assert_eq!(IcmpType::from_u8(8), Some(IcmpType::EchoRequest));
        assert_eq!(IcmpType::from_u8(11), Some(IcmpType::TimeExceeded));
        assert_eq!(IcmpType::from_u8(5), None);
    }

    #[test]
    fn test_parse_echo_request() {
        let data = make_echo_request();
        let icmp = IcmpPacket::parse(&data).unwrap();

        assert_eq!(icmp.icmp_type(), IcmpType::EchoRequest as u8);
        assert_eq!(icmp.code(), 0);
        assert_eq!(icmp.identifier(), 0x1234);
        assert_eq!(icmp.sequence(), 7);
        assert_eq!(icmp.payload(), b"ping!");
        assert!(icmp.validate_checksum());
    }

    #[test]
    fn test_parse_too_short() {
        assert!(IcmpPacket::parse(&[8, 0, 0, 0, 0, 0, 0]).is_err());
    }

    #[test]
    fn test_echo_reply_in_place() {
        let mut data = make_echo_request();
        echo_reply_in_place(&mut data).unwrap();

        let reply = IcmpPacket::parse(&data).unwrap();
        assert_eq!(reply.icmp_type(), IcmpType::EchoReply as u8);
        assert_eq!(reply.identifier(), 0x1234);
        assert_eq!(reply.sequence(), 7);
        assert_eq!(reply.payload(), b"ping!");
        assert!(reply.validate_checksum());
    }

    #[test]
    fn test_echo_reply_too_short() {
        let mut data = [8u8, 0, 0];
        assert!(echo_reply_in_place(&mut data).is_err());
    }

    #[test]
    fn test_build_time_exceeded() {
        let quoted = [0x45, 0x00, 0x00, 0x54, 0xab, 0xcd, 0x40, 0x00];
        let msg = build_error(IcmpType::TimeExceeded, time_exceeded::TTL_EXCEEDED, &quoted);

        assert_eq!(msg.len(), 16);
        assert_eq!(msg[0], 11);
        assert_eq!(msg[1], 0);
        assert_eq!(&msg[4..8], &[0, 0, 0, 0]);
        assert_eq!(&msg[8..], &quoted);
        assert!(checksum::verify(&msg));
    }

    #[test]
    fn test_build_destination_unreachable() {
        let quoted = [0x45, 0, 0, 0x1c, 0, 1, 0, 0];
        let msg = build_error(
            IcmpType::DestinationUnreachable,
            dest_unreachable::NET_UNREACHABLE,
            &quoted,
        );

        let icmp = IcmpPacket::parse(&msg).unwrap();
        assert_eq!(icmp.icmp_type(), 3);
        assert_eq!(icmp.code(), 0);
        assert_eq!(icmp.payload(), &quoted);
        assert!(icmp.validate_checksum());
    }
}
