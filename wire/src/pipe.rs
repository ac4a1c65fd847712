//! Length-prefixed datagram framing for byte-stream links to the TUN device.
//!
//! Each datagram is preceded by its length as a big-endian `u16`.

use crate::error::{EncodeError, FramingError};
use crate::framing::IPV6_HEADER_SIZE;

/// Size of the length prefix.
pub const PIPE_PREFIX_LEN: usize = 2;

/// Encodes the length prefix for a datagram.
pub fn encode_pipe_prefix(datagram_len: usize) -> Result<[u8; PIPE_PREFIX_LEN], EncodeError> {
    let len = u16::try_from(datagram_len).map_err(|_| EncodeError::LengthOverflow {
        length: datagram_len,
    })?;
    Ok(len.to_be_bytes())
}

/// Decodes a length prefix, rejecting lengths no IPv6 datagram can have.
///
/// A bad prefix means the stream lost synchronisation.
pub fn decode_pipe_prefix(
    prefix: [u8; PIPE_PREFIX_LEN],
    max_len: usize,
) -> Result<usize, FramingError> {
    let length = usize::from(u16::from_be_bytes(prefix));
    if length < IPV6_HEADER_SIZE || length > max_len {
        return Err(FramingError::InvalidPipeLength { length });
    }
    Ok(length)
}

/// Appends one framed datagram to `out`.
pub fn encode_pipe_frame(datagram: &[u8], out: &mut Vec<u8>) -> Result<(), EncodeError> {
    let prefix = encode_pipe_prefix(datagram.len())?;
    out.reserve(PIPE_PREFIX_LEN + datagram.len());
    out.extend_from_slice(&prefix);
    out.extend_from_slice(datagram);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_big_endian() {
        assert_eq!(encode_pipe_prefix(0x0130).unwrap(), [0x01, 0x30]);
    }

    #[test]
    fn prefix_overflow() {
        assert_eq!(
            encode_pipe_prefix(70_000),
            Err(EncodeError::LengthOverflow { length: 70_000 })
        );
    }

    #[test]
    fn decode_bounds() {
        assert_eq!(decode_pipe_prefix([0, 40], 1500), Ok(40));
        assert_eq!(
            decode_pipe_prefix([0, 39], 1500),
            Err(FramingError::InvalidPipeLength { length: 39 })
        );
        assert_eq!(
            decode_pipe_prefix([0x05, 0xDD], 1500),
            Err(FramingError::InvalidPipeLength { length: 1501 })
        );
    }

    #[test]
    fn frame_appends() {
        let mut out = vec![0xFF];
        encode_pipe_frame(&[0x60; 40], &mut out).unwrap();
        assert_eq!(out.len(), 1 + 2 + 40);
        assert_eq!(&out[1..3], &[0, 40]);
    }
}
