//! Wire format for the AYIYA tunnel transporter.
//!
//! This crate handles the binary side of the tunnel: the 44-byte signed
//! packet header, shared-secret signatures, and splitting of IPv6 datagram
//! buffers. It performs no I/O and keeps no state.
//!
//! # Design Principles
//!
//! - **Stateless admission** - [`precheck`] never needs a key, so it can run
//!   before a tunnel is known.
//! - **Single arbiter** - [`verify_packet`] is the only authenticity check.
//! - **Bounded decoding** - All length fields are validated against the bytes actually present.
//!
//! See `WIRE_FORMAT.md` for the complete layout.

mod error;
mod framing;
mod header;
mod identity;
mod limits;
mod packet;
mod pipe;
mod signature;

pub use error::{DecodeError, EncodeError, FramingError, WireResult};
pub use framing::{
    datagram_len, ipv6_destination, ipv6_payload_len, split_datagrams, IPV6_HEADER_SIZE,
};
pub use header::{
    pack_nibbles, AuthType, HashAlgorithm, IdentityType, NextHeader, OpCode, PacketHeader,
    HEADER_SIZE, IDENTITY_BYTE, IDENTITY_LEN, MAX_CLOCK_SKEW_SECS, SIGNATURE_BYTE, SIGNATURE_LEN,
    SIGNED_PREFIX_LEN,
};
pub use identity::Identity;
pub use limits::Limits;
pub use packet::{
    current_epoch, decode_header, encode_packet, encode_packet_into, epoch_of, precheck,
    verify_packet, VerifiedPacket,
};
pub use pipe::{decode_pipe_prefix, encode_pipe_frame, encode_pipe_prefix, PIPE_PREFIX_LEN};
pub use signature::{sign, SharedKey, Signature};

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    #[test]
    fn public_api_exports() {
        // Verify all expected items are exported
        let _ = HEADER_SIZE;
        let _ = IPV6_HEADER_SIZE;
        let _ = PIPE_PREFIX_LEN;
        let _ = Limits::default();
        let _ = Identity::UNSPECIFIED;
        let _ = OpCode::Forward;
        let _ = NextHeader::Ipv6;
        let _ = SharedKey::derive("");

        // Error types
        let _: WireResult<()> = Ok(());
    }

    #[test]
    fn header_size_constant_correct() {
        assert_eq!(
            HEADER_SIZE,
            1 // identity length/type
                + 1 // signature length/hash
                + 1 // auth/opcode
                + 1 // next header
                + size_of::<i32>() // epoch
                + IDENTITY_LEN
                + SIGNATURE_LEN
        );
    }

    #[test]
    fn heartbeat_and_forward_integration() {
        let key = SharedKey::derive("pw");
        let id: Identity = "2001:db8::7".parse().unwrap();
        let beat = encode_packet(&PacketHeader::heartbeat(id, 100), &key, &[]);
        let packet = verify_packet(&beat, &key, &[id], 100, &Limits::default()).unwrap();
        assert_eq!(packet.header.opcode, OpCode::Noop);
        assert!(packet.payload.is_empty());
    }
}
