//! Error types for wire format operations.

use std::fmt;

use crate::identity::Identity;

/// Result type for wire format operations.
pub type WireResult<T> = Result<T, DecodeError>;

/// Reasons a received packet is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
    /// Packet is too small to contain the required header.
    PacketTooSmall { actual: usize, required: usize },

    /// Packet exceeds the configured size limit.
    PacketTooLarge { actual: usize, limit: usize },

    /// Identity length/type byte is not the supported constant.
    InvalidIdentityByte { found: u8 },

    /// Signature length/hash algorithm byte is not the supported constant.
    InvalidSignatureByte { found: u8 },

    /// Authentication method is not shared secret.
    UnsupportedAuthType { found: u8 },

    /// Opcode nibble is outside the known range.
    UnknownOpCode { found: u8 },

    /// Next header is neither IPv6 nor "no next header".
    UnknownNextHeader { found: u8 },

    /// Sender clock differs too much from ours.
    ClockSkew { sender_epoch: i32, local_epoch: i32 },

    /// Sender identity does not belong to the verifying tunnel.
    SenderMismatch { sender: Identity },

    /// Recomputed signature differs from the received one.
    SignatureMismatch,

    /// Payload announced as IPv6 carries another IP version.
    PayloadNotIpv6 { version: Option<u8> },
}

/// Errors that can occur while splitting IPv6 datagrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingError {
    /// Fewer bytes than a minimal IPv6 header.
    TooShort { actual: usize },
    /// Version nibble is not 6.
    NotIpv6 { version: u8 },
    /// Declared datagram length exceeds the bytes available.
    Truncated { declared: usize, available: usize },
    /// Pipe length prefix cannot describe an IPv6 datagram.
    InvalidPipeLength { length: usize },
}

/// Errors that can occur during encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    BufferTooSmall { needed: usize, available: usize },
    LengthOverflow { length: usize },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PacketTooSmall { actual, required } => {
                write!(
                    f,
                    "packet too small: {actual} bytes, need at least {required}"
                )
            }
            Self::PacketTooLarge { actual, limit } => {
                write!(f, "packet too large: {actual} > {limit} bytes")
            }
            Self::InvalidIdentityByte { found } => {
                write!(f, "invalid identity byte: 0x{found:02X}")
            }
            Self::InvalidSignatureByte { found } => {
                write!(f, "invalid signature byte: 0x{found:02X}")
            }
            Self::UnsupportedAuthType { found } => {
                write!(f, "unsupported auth type: {found}")
            }
            Self::UnknownOpCode { found } => write!(f, "unknown opcode: {found}"),
            Self::UnknownNextHeader { found } => write!(f, "unknown next header: {found}"),
            Self::ClockSkew {
                sender_epoch,
                local_epoch,
            } => {
                let skew = i64::from(*local_epoch) - i64::from(*sender_epoch);
                write!(
                    f,
                    "clock skew: sender epoch {sender_epoch} is {skew}s away from {local_epoch}"
                )
            }
            Self::SenderMismatch { sender } => write!(f, "unexpected sender identity {sender}"),
            Self::SignatureMismatch => write!(f, "signature mismatch"),
            Self::PayloadNotIpv6 { version } => match version {
                Some(version) => write!(f, "payload is not IPv6: version {version}"),
                None => write!(f, "payload is not IPv6: empty"),
            },
        }
    }
}

impl fmt::Display for FramingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { actual } => {
                write!(f, "datagram too short: {actual} bytes, need at least 40")
            }
            Self::NotIpv6 { version } => write!(f, "not an IPv6 datagram: version {version}"),
            Self::Truncated {
                declared,
                available,
            } => {
                write!(
                    f,
                    "truncated datagram: declared {declared} bytes, have {available}"
                )
            }
            Self::InvalidPipeLength { length } => {
                write!(f, "invalid pipe frame length: {length}")
            }
        }
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferTooSmall { needed, available } => {
                write!(f, "buffer too small: need {needed}, have {available}")
            }
            Self::LengthOverflow { length } => {
                write!(f, "length overflow: {length}")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

impl std::error::Error for FramingError {}

impl std::error::Error for EncodeError {}
