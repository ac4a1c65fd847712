//! Packet header types and constants.

use crate::identity::Identity;

/// Header size in bytes (44 total).
pub const HEADER_SIZE: usize = 1 + 1 + 1 + 1 + 4 + IDENTITY_LEN + SIGNATURE_LEN;

/// Length of the header prefix covered by the signature (everything before it).
pub const SIGNED_PREFIX_LEN: usize = HEADER_SIZE - SIGNATURE_LEN;

/// Length of the sender identity field.
pub const IDENTITY_LEN: usize = 16;

/// Length of the SHA-1 signature field.
pub const SIGNATURE_LEN: usize = 20;

/// Maximum accepted distance between sender and local epoch seconds.
pub const MAX_CLOCK_SKEW_SECS: u32 = 1000;

pub(crate) const EPOCH_OFFSET: usize = 4;
pub(crate) const IDENTITY_OFFSET: usize = 8;
pub(crate) const SIGNATURE_OFFSET: usize = SIGNED_PREFIX_LEN;

/// Identity length nibble: 2^4 = 16 bytes.
const IDENTITY_LEN_NIBBLE: u8 = 4;

/// Signature length nibble: 5 * 4 = 20 bytes.
const SIGNATURE_LEN_NIBBLE: u8 = 5;

/// Representation of the sender identity. Only `Integer` is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum IdentityType {
    None = 0,
    Integer = 1,
    String = 2,
}

/// Signature hash algorithm. Only `Sha1` is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HashAlgorithm {
    None = 0,
    Md5 = 1,
    Sha1 = 2,
    Umac = 3,
}

/// Authentication method. Only `SharedSecret` is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AuthType {
    None = 0,
    SharedSecret = 1,
    Pgp = 2,
}

/// Operation carried by a packet.
///
/// All eight codes pass header checks; only `Noop` and `Forward` are acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    Noop = 0,
    Forward = 1,
    EchoRequest = 2,
    EchoRequestForward = 3,
    EchoResponse = 4,
    Motd = 5,
    QueryRequest = 6,
    QueryResponse = 7,
}

impl OpCode {
    /// Parses an opcode from the low nibble of the third header byte.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Noop),
            1 => Some(Self::Forward),
            2 => Some(Self::EchoRequest),
            3 => Some(Self::EchoRequestForward),
            4 => Some(Self::EchoResponse),
            5 => Some(Self::Motd),
            6 => Some(Self::QueryRequest),
            7 => Some(Self::QueryResponse),
            _ => None,
        }
    }

    /// Returns `true` for the opcodes the tunnel engine acts on.
    #[must_use]
    pub const fn is_actionable(self) -> bool {
        matches!(self, Self::Noop | Self::Forward)
    }
}

/// Protocol of the payload, as an IP protocol number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NextHeader {
    /// Embedded IPv6 datagram.
    Ipv6 = 41,
    /// No payload.
    None = 59,
}

impl NextHeader {
    #[must_use]
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            41 => Some(Self::Ipv6),
            59 => Some(Self::None),
            _ => None,
        }
    }
}

/// Packs two 4-bit values into one byte, high nibble first.
#[must_use]
pub const fn pack_nibbles(high: u8, low: u8) -> u8 {
    ((high & 0x0F) << 4) | (low & 0x0F)
}

/// Expected first header byte: identity length and type.
pub const IDENTITY_BYTE: u8 = pack_nibbles(IDENTITY_LEN_NIBBLE, IdentityType::Integer as u8);

/// Expected second header byte: signature length and hash algorithm.
pub const SIGNATURE_BYTE: u8 = pack_nibbles(SIGNATURE_LEN_NIBBLE, HashAlgorithm::Sha1 as u8);

/// Decoded packet header, without the signature field.
///
/// See `WIRE_FORMAT.md` for the byte layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub opcode: OpCode,
    pub next_header: NextHeader,
    /// Sender wall-clock time in seconds since the Unix epoch.
    pub epoch: i32,
    pub sender: Identity,
}

impl PacketHeader {
    /// Header for a forwarded IPv6 datagram.
    #[must_use]
    pub const fn forward(sender: Identity, epoch: i32) -> Self {
        Self {
            opcode: OpCode::Forward,
            next_header: NextHeader::Ipv6,
            epoch,
            sender,
        }
    }

    /// Header for an empty heartbeat.
    #[must_use]
    pub const fn heartbeat(sender: Identity, epoch: i32) -> Self {
        Self {
            opcode: OpCode::Noop,
            next_header: NextHeader::None,
            epoch,
            sender,
        }
    }

    /// Writes the signed prefix (first 24 bytes) of the header.
    pub(crate) fn write_prefix(&self, out: &mut [u8; SIGNED_PREFIX_LEN]) {
        out[0] = IDENTITY_BYTE;
        out[1] = SIGNATURE_BYTE;
        out[2] = pack_nibbles(AuthType::SharedSecret as u8, self.opcode as u8);
        out[3] = self.next_header as u8;
        out[EPOCH_OFFSET..IDENTITY_OFFSET].copy_from_slice(&self.epoch.to_be_bytes());
        out[IDENTITY_OFFSET..SIGNED_PREFIX_LEN].copy_from_slice(self.sender.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_size_is_correct() {
        // id(1) + sig(1) + auth/op(1) + next(1) + epoch(4) + identity(16) + signature(20)
        assert_eq!(HEADER_SIZE, 44);
        assert_eq!(SIGNED_PREFIX_LEN, 24);
    }

    #[test]
    fn fixed_header_bytes() {
        assert_eq!(IDENTITY_BYTE, 0x41);
        assert_eq!(SIGNATURE_BYTE, 0x52);
    }

    #[test]
    fn pack_nibbles_masks_inputs() {
        assert_eq!(pack_nibbles(0x1F, 0xF3), 0xF3);
        assert_eq!(pack_nibbles(1, 1), 0x11);
    }

    #[test]
    fn opcode_from_raw_covers_all_known() {
        for raw in 0..8u8 {
            let op = OpCode::from_raw(raw).unwrap();
            assert_eq!(op as u8, raw);
        }
        assert_eq!(OpCode::from_raw(8), None);
        assert_eq!(OpCode::from_raw(15), None);
    }

    #[test]
    fn only_noop_and_forward_are_actionable() {
        assert!(OpCode::Noop.is_actionable());
        assert!(OpCode::Forward.is_actionable());
        assert!(!OpCode::EchoRequest.is_actionable());
        assert!(!OpCode::Motd.is_actionable());
    }

    #[test]
    fn next_header_from_raw() {
        assert_eq!(NextHeader::from_raw(41), Some(NextHeader::Ipv6));
        assert_eq!(NextHeader::from_raw(59), Some(NextHeader::None));
        assert_eq!(NextHeader::from_raw(17), None);
    }

    #[test]
    fn prefix_layout() {
        let sender = Identity::from([0xAB; 16]);
        let header = PacketHeader::forward(sender, 0x0102_0304);
        let mut prefix = [0u8; SIGNED_PREFIX_LEN];
        header.write_prefix(&mut prefix);

        assert_eq!(prefix[0], IDENTITY_BYTE);
        assert_eq!(prefix[1], SIGNATURE_BYTE);
        assert_eq!(prefix[2], 0x11);
        assert_eq!(prefix[3], 41);
        assert_eq!(&prefix[4..8], &[1, 2, 3, 4]);
        assert_eq!(&prefix[8..24], &[0xAB; 16]);
    }

    #[test]
    fn heartbeat_header() {
        let header = PacketHeader::heartbeat(Identity::from([0; 16]), 7);
        assert_eq!(header.opcode, OpCode::Noop);
        assert_eq!(header.next_header, NextHeader::None);
    }

    #[test]
    fn header_const_constructible() {
        const HEADER: PacketHeader = PacketHeader::forward(Identity::UNSPECIFIED, 0);
        assert_eq!(HEADER.epoch, 0);
    }
}
