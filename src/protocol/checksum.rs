//! Internet checksum (RFC 1071)
//!
//! One's-complement sum of 16-bit big-endian words, shared by the IPv4
//! header and ICMP message checksums.

/// Compute the Internet checksum of `data`.
///
/// An odd trailing byte is padded with zero. Running this over a buffer
/// whose checksum field already holds the correct value yields 0.
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;

    let mut words = data.chunks_exact(2);
    for word in &mut words {
        sum = sum.wrapping_add(u16::from_be_bytes([word[0], word[1]]) as u32);
    }
    if let [last] = words.remainder() {
        sum = sum.wrapping_add((*last as u32) << 8);
    }

    // Fold carries back into the low 16 bits
    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    !(sum as u16)
}

/// Check a buffer whose checksum field is already filled in
pub fn verify(data: &[u8]) -> bool {
    checksum(data) == 0
}

/// Zero the 2-byte checksum field at `offset`, recompute it over `data`
/// and store the result in network byte order.
pub fn fill(data: &mut [u8], offset: usize) {
    data[offset] = 0;
    data[offset + 1] = 0;
    let sum = checksum(data);
    data[offset..offset + 2].copy_from_slice(&sum.to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    // 20-byte header from RFC 1071 style worked examples
    fn sample_header() -> [u8; 20] {
        [
            0x45, 0x00, 0x00, 0x73, 0x00, 0x00, 0x40, 0x00, 0x40, 0x11, 0xb8, 0x61, 0xc0, 0xa8,
            0x00, 0x01, 0xc0, 0xa8, 0x00, 0xc7,
        ]
    }

    #[test]
    fn test_known_header_verifies() {
        assert!(verify(&sample_header()));
    }

    #[test]
    fn test_fill_then_verify() {
        let mut header = sample_header();
        header[10] = 0xde;
        header[11] = 0xad;
        fill(&mut header, 10);
        assert_eq!(&header[10..12], &[0xb8, 0x61]);
        assert_eq!(checksum(&header), 0);
    }

    #[test]
    fn test_any_single_byte_corruption_is_detected() {
        let header = sample_header();
        for i in 0..header.len() {
            let mut corrupted = header;
            corrupted[i] ^= 0x01;
            assert!(!verify(&corrupted), "corruption at byte {} not detected", i);
        }
    }

    #[test]
    fn test_odd_length_pads_with_zero() {
        assert_eq!(checksum(&[0x12, 0x34, 0x56]), checksum(&[0x12, 0x34, 0x56, 0x00]));
    }

    #[test]
    fn test_empty_buffer() {
        assert_eq!(checksum(&[]), 0xFFFF);
    }
}
