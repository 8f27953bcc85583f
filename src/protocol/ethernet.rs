//! Ethernet II frame parsing and construction

use super::MacAddr;
use crate::{Error, Result};

/// Ethernet II header size (dst + src + ethertype)
pub const HEADER_SIZE: usize = 14;
/// Largest frame the router receives or queues (without FCS)
pub const MAX_FRAME_SIZE: usize = 1600;

const DST_OFFSET: usize = 0;
const SRC_OFFSET: usize = 6;
const ETHERTYPE_OFFSET: usize = 12;

/// Parsed Ethernet frame (zero-copy reference)
#[derive(Debug)]
pub struct Frame<'a> {
    buffer: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Parse an Ethernet frame from a buffer
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        if buffer.len() < HEADER_SIZE {
            return Err(Error::Parse(format!(
                "frame too short ({} bytes)",
                buffer.len()
            )));
        }

        Ok(Self { buffer })
    }

    pub fn dst_mac(&self) -> MacAddr {
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&self.buffer[DST_OFFSET..DST_OFFSET + 6]);
        MacAddr(mac)
    }

    pub fn src_mac(&self) -> MacAddr {
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&self.buffer[SRC_OFFSET..SRC_OFFSET + 6]);
        MacAddr(mac)
    }

    pub fn ethertype(&self) -> u16 {
        u16::from_be_bytes([
            self.buffer[ETHERTYPE_OFFSET],
            self.buffer[ETHERTYPE_OFFSET + 1],
        ])
    }

    pub fn payload(&self) -> &'a [u8] {
        &self.buffer[HEADER_SIZE..]
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.buffer
    }
}

/// Overwrite the destination and source addresses of a frame in place.
///
/// The caller guarantees `frame` holds at least a full Ethernet header.
pub fn rewrite_macs(frame: &mut [u8], dst: MacAddr, src: MacAddr) {
    frame[DST_OFFSET..DST_OFFSET + 6].copy_from_slice(&dst.0);
    frame[SRC_OFFSET..SRC_OFFSET + 6].copy_from_slice(&src.0);
}

/// Builder for constructing Ethernet frames
pub struct FrameBuilder {
    buffer: Vec<u8>,
}

impl FrameBuilder {
    pub fn new() -> Self {
        Self {
            buffer: vec![0u8; HEADER_SIZE],
        }
    }

    /// Builder whose backing buffer is sized for `payload_len` bytes
    pub fn with_payload_capacity(payload_len: usize) -> Self {
        let mut buffer = Vec::with_capacity(HEADER_SIZE + payload_len);
        buffer.resize(HEADER_SIZE, 0);
        Self { buffer }
    }

    pub fn dst_mac(mut self, mac: MacAddr) -> Self {
        self.buffer[DST_OFFSET..DST_OFFSET + 6].copy_from_slice(&mac.0);
        self
    }

    pub fn src_mac(mut self, mac: MacAddr) -> Self {
        self.buffer[SRC_OFFSET..SRC_OFFSET + 6].copy_from_slice(&mac.0);
        self
    }

    pub fn ethertype(mut self, ethertype: u16) -> Self {
        self.buffer[ETHERTYPE_OFFSET..HEADER_SIZE].copy_from_slice(&ethertype.to_be_bytes());
        self
    }

    pub fn payload(mut self, payload: &[u8]) -> Self {
        self.buffer.truncate(HEADER_SIZE);
        self.buffer.extend_from_slice(payload);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buffer
    }
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}
