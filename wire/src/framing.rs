//! Splitting buffers into IPv6 datagrams.

use crate::error::FramingError;
use crate::identity::Identity;

/// Size of the fixed IPv6 header.
pub const IPV6_HEADER_SIZE: usize = 40;

const PAYLOAD_LEN_OFFSET: usize = 4;
const DESTINATION_OFFSET: usize = 24;

fn ip_version(datagram: &[u8]) -> Option<u8> {
    datagram.first().map(|byte| byte >> 4)
}

/// Reads the IPv6 payload length field (excludes the 40-byte header).
#[must_use]
pub fn ipv6_payload_len(datagram: &[u8]) -> Option<usize> {
    let raw = datagram.get(PAYLOAD_LEN_OFFSET..PAYLOAD_LEN_OFFSET + 2)?;
    Some(usize::from(u16::from_be_bytes([raw[0], raw[1]])))
}

/// Destination address of an IPv6 datagram.
#[must_use]
pub fn ipv6_destination(datagram: &[u8]) -> Option<Identity> {
    Identity::from_slice(datagram.get(DESTINATION_OFFSET..)?)
}

/// Validates the header of the datagram at the start of `buf` and returns
/// its total length.
pub fn datagram_len(buf: &[u8]) -> Result<usize, FramingError> {
    if buf.len() < IPV6_HEADER_SIZE {
        return Err(FramingError::TooShort { actual: buf.len() });
    }
    let version = ip_version(buf).unwrap_or_default();
    if version != 6 {
        return Err(FramingError::NotIpv6 { version });
    }
    let payload_len = ipv6_payload_len(buf).unwrap_or_default();
    Ok(IPV6_HEADER_SIZE + payload_len)
}

/// Splits a buffer holding one or more back-to-back IPv6 datagrams.
///
/// Every datagram's declared length must fit the remaining bytes; a short
/// tail is an error rather than a partial datagram.
pub fn split_datagrams(buf: &[u8]) -> Result<Vec<&[u8]>, FramingError> {
    let mut datagrams = Vec::new();
    let mut rest = buf;
    loop {
        let declared = datagram_len(rest)?;
        if rest.len() < declared {
            return Err(FramingError::Truncated {
                declared,
                available: rest.len(),
            });
        }
        let (datagram, tail) = rest.split_at(declared);
        datagrams.push(datagram);
        if tail.is_empty() {
            return Ok(datagrams);
        }
        rest = tail;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datagram(payload_len: u16, dst_last: u8) -> Vec<u8> {
        let mut bytes = vec![0u8; IPV6_HEADER_SIZE + usize::from(payload_len)];
        bytes[0] = 0x60;
        bytes[4..6].copy_from_slice(&payload_len.to_be_bytes());
        bytes[39] = dst_last;
        bytes
    }

    #[test]
    fn single_datagram() {
        let bytes = datagram(8, 1);
        let parts = split_datagrams(&bytes).unwrap();
        assert_eq!(parts, vec![bytes.as_slice()]);
    }

    #[test]
    fn header_only_datagram() {
        let bytes = datagram(0, 1);
        assert_eq!(split_datagrams(&bytes).unwrap().len(), 1);
    }

    #[test]
    fn rejects_short_buffer() {
        assert_eq!(
            split_datagrams(&[0x60; 39]),
            Err(FramingError::TooShort { actual: 39 })
        );
        assert_eq!(
            split_datagrams(&[]),
            Err(FramingError::TooShort { actual: 0 })
        );
    }

    #[test]
    fn rejects_ipv4() {
        let mut bytes = datagram(8, 1);
        bytes[0] = 0x45;
        assert_eq!(
            split_datagrams(&bytes),
            Err(FramingError::NotIpv6 { version: 4 })
        );
    }

    #[test]
    fn rejects_truncated_single() {
        let bytes = datagram(8, 1);
        assert_eq!(
            split_datagrams(&bytes[..47]),
            Err(FramingError::Truncated {
                declared: 48,
                available: 47
            })
        );
    }

    #[test]
    fn trailing_garbage_is_error() {
        let mut bytes = datagram(8, 1);
        bytes.extend_from_slice(&[0x60; 10]);
        assert_eq!(
            split_datagrams(&bytes),
            Err(FramingError::TooShort { actual: 10 })
        );
    }

    #[test]
    fn address_accessors() {
        let bytes = datagram(8, 0x42);
        assert_eq!(ip_version(&bytes), Some(6));
        assert_eq!(ipv6_payload_len(&bytes), Some(8));
        assert_eq!(ipv6_destination(&bytes).unwrap().as_bytes()[15], 0x42);
        assert_eq!(ipv6_destination(&bytes[..39]), None);
    }
}
