//! Packet building, admission checks and signature verification.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{DecodeError, EncodeError, WireResult};
use crate::header::{
    AuthType, NextHeader, OpCode, PacketHeader, EPOCH_OFFSET, HEADER_SIZE, IDENTITY_BYTE,
    IDENTITY_OFFSET, SIGNATURE_BYTE, SIGNATURE_OFFSET, SIGNED_PREFIX_LEN,
};
use crate::identity::Identity;
use crate::limits::Limits;
use crate::signature::{sign, SharedKey, Signature};

/// A packet whose header and signature have been verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedPacket<'a> {
    pub header: PacketHeader,
    pub payload: &'a [u8],
}

/// Current wall-clock time as header epoch seconds.
#[must_use]
pub fn current_epoch() -> i32 {
    epoch_of(SystemTime::now())
}

/// Converts a point in time to header epoch seconds.
///
/// The field is a signed 32-bit value; later times wrap like the sender's
/// integer cast would.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn epoch_of(time: SystemTime) -> i32 {
    let secs = time
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs());
    secs as i32
}

/// Builds a signed packet: header, signature, then payload.
#[must_use]
pub fn encode_packet(header: &PacketHeader, key: &SharedKey, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; HEADER_SIZE + payload.len()];
    let written = encode_packet_into(header, key, payload, &mut out);
    debug_assert_eq!(written, Ok(out.len()));
    out
}

/// Builds a signed packet into a caller-provided buffer.
pub fn encode_packet_into(
    header: &PacketHeader,
    key: &SharedKey,
    payload: &[u8],
    out: &mut [u8],
) -> Result<usize, EncodeError> {
    let needed = HEADER_SIZE + payload.len();
    if out.len() < needed {
        return Err(EncodeError::BufferTooSmall {
            needed,
            available: out.len(),
        });
    }

    let mut prefix = [0u8; SIGNED_PREFIX_LEN];
    header.write_prefix(&mut prefix);
    let signature = sign(&prefix, key, payload);

    out[..SIGNED_PREFIX_LEN].copy_from_slice(&prefix);
    out[SIGNATURE_OFFSET..HEADER_SIZE].copy_from_slice(&signature);
    out[HEADER_SIZE..needed].copy_from_slice(payload);
    Ok(needed)
}

/// Decodes and checks the header without any key.
///
/// These are the only checks applied before the packet is associated with
/// a tunnel.
pub fn decode_header(buf: &[u8], local_epoch: i32, limits: &Limits) -> WireResult<PacketHeader> {
    if buf.len() < HEADER_SIZE {
        return Err(DecodeError::PacketTooSmall {
            actual: buf.len(),
            required: HEADER_SIZE,
        });
    }
    if buf.len() > limits.max_packet_bytes {
        return Err(DecodeError::PacketTooLarge {
            actual: buf.len(),
            limit: limits.max_packet_bytes,
        });
    }

    if buf[0] != IDENTITY_BYTE {
        return Err(DecodeError::InvalidIdentityByte { found: buf[0] });
    }
    if buf[1] != SIGNATURE_BYTE {
        return Err(DecodeError::InvalidSignatureByte { found: buf[1] });
    }

    let auth = buf[2] >> 4;
    if auth != AuthType::SharedSecret as u8 {
        return Err(DecodeError::UnsupportedAuthType { found: auth });
    }
    let opcode_raw = buf[2] & 0x0F;
    let opcode = OpCode::from_raw(opcode_raw)
        .ok_or(DecodeError::UnknownOpCode { found: opcode_raw })?;

    let next_header =
        NextHeader::from_raw(buf[3]).ok_or(DecodeError::UnknownNextHeader { found: buf[3] })?;

    let epoch = i32::from_be_bytes(buf[EPOCH_OFFSET..IDENTITY_OFFSET].try_into().unwrap());
    if !limits.accepts_skew(epoch, local_epoch) {
        return Err(DecodeError::ClockSkew {
            sender_epoch: epoch,
            local_epoch,
        });
    }

    let sender = Identity::new(buf[IDENTITY_OFFSET..SIGNATURE_OFFSET].try_into().unwrap());

    Ok(PacketHeader {
        opcode,
        next_header,
        epoch,
        sender,
    })
}

/// Stateless admission check returning the claimed sender identity.
#[must_use]
pub fn precheck(buf: &[u8], local_epoch: i32) -> Option<Identity> {
    decode_header(buf, local_epoch, &Limits::default())
        .ok()
        .map(|header| header.sender)
}

/// Verifies a packet against one tunnel's key and accepted sender identities.
///
/// Re-runs the header checks, then requires a known sender, a matching
/// signature and, for embedded IPv6, a version 6 payload.
pub fn verify_packet<'a>(
    buf: &'a [u8],
    key: &SharedKey,
    accepted_senders: &[Identity],
    local_epoch: i32,
    limits: &Limits,
) -> WireResult<VerifiedPacket<'a>> {
    let header = decode_header(buf, local_epoch, limits)?;
    if !accepted_senders.contains(&header.sender) {
        return Err(DecodeError::SenderMismatch {
            sender: header.sender,
        });
    }

    let prefix: &[u8; SIGNED_PREFIX_LEN] = buf[..SIGNED_PREFIX_LEN].try_into().unwrap();
    let payload = &buf[HEADER_SIZE..];
    let received: &Signature = buf[SIGNATURE_OFFSET..HEADER_SIZE].try_into().unwrap();
    if sign(prefix, key, payload) != *received {
        return Err(DecodeError::SignatureMismatch);
    }

    if header.next_header == NextHeader::Ipv6 {
        let version = payload.first().map(|byte| byte >> 4);
        if version != Some(6) {
            return Err(DecodeError::PayloadNotIpv6 { version });
        }
    }

    Ok(VerifiedPacket { header, payload })
}
